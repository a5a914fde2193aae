//! Indexing pipeline
//!
//! Core logic for indexing a document: segmentation, metadata attachment,
//! corpus write, batch embedding, and vector upsert. The corpus file and
//! the vector index end up addressable under the same id scheme: explicit
//! ids when supplied, positional "{source}-{ordinal}" ids always.

use crate::segmenter::Segmenter;
use cityscope_common::corpus;
use cityscope_common::embeddings::Embedder;
use cityscope_common::errors::Result;
use cityscope_common::index::{UpsertRecord, VectorIndex};
use cityscope_common::models::{CorpusRecord, Metadata};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of one ingest run
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Number of chunks written to the corpus file
    pub chunks_written: usize,

    /// Number of vectors upserted
    pub vectors_indexed: usize,
}

/// Chunk → embed → upsert pipeline
pub struct IngestionPipeline {
    segmenter: Segmenter,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    corpus_path: PathBuf,
    namespace: String,
    source: String,
}

impl IngestionPipeline {
    pub fn new(
        segmenter: Segmenter,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        corpus_path: PathBuf,
        namespace: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            segmenter,
            embedder,
            index,
            corpus_path,
            namespace: namespace.into(),
            source: source.into(),
        }
    }

    /// Segment a document, persist the corpus file, and index the chunks.
    #[instrument(skip(self, text, base_metadata), fields(source = %self.source))]
    pub async fn ingest_document(&self, text: &str, base_metadata: &Metadata) -> Result<IngestReport> {
        let chunks = self.segmenter.chunk(text)?;
        let records = self.segmenter.attach_metadata(&chunks, base_metadata);

        corpus::write_corpus(&self.corpus_path, &records)?;

        let indexed = self.index_records(&records).await?;

        info!(
            chunks = records.len(),
            indexed = indexed,
            model = self.embedder.model_name(),
            "Document ingested"
        );
        Ok(IngestReport {
            chunks_written: records.len(),
            vectors_indexed: indexed,
        })
    }

    /// Embed freshly produced records in batches and upsert them, assigning
    /// positional ordinals from their order.
    pub async fn index_records(&self, records: &[CorpusRecord]) -> Result<usize> {
        let slots: Vec<(usize, &CorpusRecord)> = records.iter().enumerate().collect();
        self.index_slots(&slots).await
    }

    /// Re-index the corpus file already on disk.
    ///
    /// Records keep their file slot ordinals, so fallback ids written to
    /// the index still resolve through the id map when the file carries
    /// malformed lines.
    pub async fn reindex_corpus(&self) -> Result<usize> {
        let slotted = corpus::read_corpus_slots(&self.corpus_path)?;
        let slots: Vec<(usize, &CorpusRecord)> = slotted
            .iter()
            .map(|(ordinal, record)| (*ordinal, record))
            .collect();
        self.index_slots(&slots).await
    }

    async fn index_slots(&self, records: &[(usize, &CorpusRecord)]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|(_, r)| r.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let upserts: Vec<UpsertRecord> = records
            .iter()
            .zip(vectors)
            .map(|((ordinal, record), values)| {
                let id = record
                    .id
                    .clone()
                    .unwrap_or_else(|| CorpusRecord::fallback_id(&self.source, *ordinal));

                // Vector metadata carries everything but the text body; the
                // corpus file remains the source of truth for text.
                let mut metadata = record.metadata.clone();
                metadata.insert("char_length".into(), Value::from(record.char_length));
                metadata.insert("token_estimate".into(), Value::from(record.token_estimate));

                UpsertRecord {
                    id,
                    values,
                    metadata,
                }
            })
            .collect();

        self.index.upsert(&self.namespace, upserts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cityscope_common::embeddings::MockEmbedder;
    use cityscope_common::index::MockIndex;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir, index: Arc<MockIndex>) -> IngestionPipeline {
        IngestionPipeline::new(
            Segmenter::with_windows(10, 2),
            Arc::new(MockEmbedder::new(16)),
            index,
            dir.path().join("zoning_chunks.jsonl"),
            "zoning-nyc",
            "zoning",
        )
    }

    #[tokio::test]
    async fn test_ingest_writes_corpus_and_upserts() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(MockIndex::default());
        let pipe = pipeline(&dir, index.clone());

        let text = "Residence districts limit floor area ratio and height. \
                    Commercial overlays permit ground floor retail use. \
                    Special purpose districts carry supplemental rules.";
        let report = pipe
            .ingest_document(text, &Metadata::new())
            .await
            .unwrap();

        assert!(report.chunks_written >= 1);
        assert_eq!(report.vectors_indexed, report.chunks_written);

        let ids = index.upserted_ids();
        assert_eq!(ids[0], "zoning-0");

        // Corpus file resolves the same ids back to text
        let map = corpus::load_id_map(&dir.path().join("zoning_chunks.jsonl"), "zoning").unwrap();
        assert!(map.contains_key("zoning-0"));
    }

    #[tokio::test]
    async fn test_empty_document_indexes_nothing() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(MockIndex::default());
        let pipe = pipeline(&dir, index.clone());

        let report = pipe.ingest_document("", &Metadata::new()).await.unwrap();
        assert_eq!(report.chunks_written, 0);
        assert_eq!(report.vectors_indexed, 0);
        assert!(index.upserted_ids().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_keeps_slot_ordinals_past_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(MockIndex::default());
        let pipe = pipeline(&dir, index.clone());

        let path = dir.path().join("zoning_chunks.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        use std::io::Write as _;
        writeln!(file, r#"{{"text":"ok one","char_length":6,"token_estimate":2}}"#).unwrap();
        writeln!(file, "corrupted line").unwrap();
        writeln!(file, r#"{{"text":"ok two","char_length":6,"token_estimate":2}}"#).unwrap();
        drop(file);

        let n = pipe.reindex_corpus().await.unwrap();
        assert_eq!(n, 2);
        // The malformed line keeps its slot, so the ids skip over it
        assert_eq!(
            index.upserted_ids(),
            vec!["zoning-0".to_string(), "zoning-2".to_string()]
        );

        // Both ids resolve back through the id map
        let map = corpus::load_id_map(&path, "zoning").unwrap();
        assert_eq!(map.get("zoning-0").unwrap(), "ok one");
        assert_eq!(map.get("zoning-2").unwrap(), "ok two");
    }

    #[tokio::test]
    async fn test_explicit_ids_win_over_positional() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(MockIndex::default());
        let pipe = pipeline(&dir, index.clone());

        let records = vec![CorpusRecord {
            id: Some("zoning-custom".into()),
            text: "Loft district conversion rules".into(),
            char_length: 30,
            token_estimate: 5,
            metadata: Metadata::new(),
        }];
        let n = pipe.index_records(&records).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(index.upserted_ids(), vec!["zoning-custom".to_string()]);
    }
}
