//! Semantic retrieval
//!
//! Embeds the query, asks the vector index for nearest neighbours, and
//! resolves each hit's opaque id back to full source text. Corpus records
//! may have been indexed under explicit ids or positional fallback ids
//! depending on which indexing path produced them, so resolution walks a
//! fallback chain instead of assuming one scheme.

use cityscope_common::corpus;
use cityscope_common::embeddings::Embedder;
use cityscope_common::errors::{AppError, Result};
use cityscope_common::index::{RawMatch, VectorIndex};
use cityscope_common::models::{CorpusRecord, VectorMatch};
use cityscope_common::TEXT_NOT_AVAILABLE;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

/// Semantic search over the zoning corpus
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    corpus_path: PathBuf,
    corpus_source: String,
    external_timeout: Duration,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        corpus_path: PathBuf,
        corpus_source: impl Into<String>,
        external_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            corpus_path,
            corpus_source: corpus_source.into(),
            external_timeout,
        }
    }

    /// Search the corpus namespace for the query's nearest neighbours.
    ///
    /// Ordering is whatever the index returns (score-descending); matches
    /// whose text cannot be resolved are kept with the sentinel text so
    /// callers still see score and metadata.
    #[instrument(skip(self), fields(top_k = top_k, namespace = namespace))]
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<VectorMatch>> {
        let timeout_ms = self.external_timeout.as_millis() as u64;

        let vector = timeout(self.external_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| AppError::EmbeddingTimeout { timeout_ms })??;

        let hits = timeout(
            self.external_timeout,
            self.index.query(namespace, &vector, top_k, true),
        )
        .await
        .map_err(|_| AppError::IndexTimeout { timeout_ms })??;

        // Rebuilt per search: the corpus file may have been rewritten by a
        // fresh ingest between queries.
        let id_map = corpus::load_id_map(&self.corpus_path, &self.corpus_source)?;

        let mut resolved = 0usize;
        let matches: Vec<VectorMatch> = hits
            .into_iter()
            .map(|hit| {
                let text = self.resolve_text(&hit, &id_map);
                if text != TEXT_NOT_AVAILABLE {
                    resolved += 1;
                }
                VectorMatch {
                    id: hit.id,
                    score: hit.score,
                    metadata: hit.metadata,
                    text,
                }
            })
            .collect();

        info!(
            matches = matches.len(),
            resolved = resolved,
            unresolved = matches.len() - resolved,
            "Semantic search completed"
        );
        Ok(matches)
    }

    /// Resolve a match id to source text.
    ///
    /// Tries, in order: exact id lookup, the fallback-id form built from
    /// the id's numeric substring, then inline `text`/`content` metadata.
    /// Returns the not-available sentinel when all three fail.
    fn resolve_text(&self, hit: &RawMatch, id_map: &HashMap<String, String>) -> String {
        if let Some(text) = id_map.get(&hit.id) {
            return text.clone();
        }

        if let Some(n) = numeric_part(&hit.id) {
            let fallback = CorpusRecord::fallback_id(&self.corpus_source, n);
            if let Some(text) = id_map.get(&fallback) {
                return text.clone();
            }
        }

        for key in ["text", "content"] {
            if let Some(text) = hit.metadata.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }

        TEXT_NOT_AVAILABLE.to_string()
    }
}

/// First contiguous digit run in an id, if any
fn numeric_part(id: &str) -> Option<usize> {
    let digits: String = id
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
