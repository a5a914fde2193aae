//! Token-window segmentation
//!
//! Splits a document into overlapping token windows. The token scheme is
//! cl100k_base BPE; when the encoder cannot be constructed the segmenter
//! falls back to whitespace words, which changes window boundaries, so the
//! fallback is logged loudly on construction.

use cityscope_common::config::ChunkingConfig;
use cityscope_common::errors::{AppError, Result};
use cityscope_common::models::{CorpusRecord, Metadata};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Splits text into overlapping token windows
pub struct Segmenter {
    max_tokens: usize,
    overlap_tokens: usize,
    encoder: Option<CoreBPE>,
}

impl Segmenter {
    /// Create a segmenter from chunking configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        let encoder = match tiktoken_rs::cl100k_base() {
            Ok(enc) => Some(enc),
            Err(e) => {
                warn!(
                    error = %e,
                    "cl100k_base encoder unavailable; falling back to \
                     whitespace tokens (chunk boundaries will differ)"
                );
                None
            }
        };

        Self {
            max_tokens: config.max_tokens,
            overlap_tokens: config.overlap_tokens,
            encoder,
        }
    }

    /// Whether the BPE token scheme is active (vs the whitespace fallback)
    pub fn uses_bpe(&self) -> bool {
        self.encoder.is_some()
    }

    /// Split `text` into windows of up to `max_tokens` tokens.
    ///
    /// Consecutive windows share `overlap_tokens` tokens; the stride is
    /// clamped to at least 1 so an overlap >= max_tokens still makes
    /// forward progress. The final window may be shorter.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        if self.max_tokens == 0 {
            return Err(AppError::InvalidArgument {
                message: "max_tokens must be positive".to_string(),
            });
        }
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let step = self.stride();

        let chunks = match &self.encoder {
            Some(enc) => {
                let tokens = enc.encode_ordinary(text);
                let mut out = Vec::new();
                let mut start = 0;
                while start < tokens.len() {
                    let end = (start + self.max_tokens).min(tokens.len());
                    // A window boundary can land inside a multi-byte
                    // character; decode the raw bytes and replace any
                    // dangling sequence instead of failing the whole text.
                    let bytes = enc.decode_bytes(&tokens[start..end]).map_err(|e| {
                        AppError::Internal {
                            message: format!("Token window decode failed: {}", e),
                        }
                    })?;
                    out.push(String::from_utf8_lossy(&bytes).into_owned());
                    start += step;
                }
                out
            }
            None => {
                let words: Vec<&str> = text.split_whitespace().collect();
                let mut out = Vec::new();
                let mut start = 0;
                while start < words.len() {
                    let end = (start + self.max_tokens).min(words.len());
                    out.push(words[start..end].join(" "));
                    start += step;
                }
                out
            }
        };

        debug!(
            input_len = text.len(),
            chunk_count = chunks.len(),
            max_tokens = self.max_tokens,
            overlap_tokens = self.overlap_tokens,
            "Text segmented"
        );
        Ok(chunks)
    }

    /// Token count of `text` under the active scheme
    pub fn token_estimate(&self, text: &str) -> usize {
        match &self.encoder {
            Some(enc) => enc.encode_ordinary(text).len(),
            None => text.split_whitespace().count().max(1),
        }
    }

    /// Merge `base` metadata onto every chunk, deriving char_length and
    /// token_estimate per chunk
    pub fn attach_metadata(&self, chunks: &[String], base: &Metadata) -> Vec<CorpusRecord> {
        chunks
            .iter()
            .map(|text| CorpusRecord {
                id: None,
                text: text.clone(),
                char_length: text.len(),
                token_estimate: self.token_estimate(text),
                metadata: base.clone(),
            })
            .collect()
    }

    fn stride(&self) -> usize {
        self.max_tokens.saturating_sub(self.overlap_tokens).max(1)
    }
}

/// Convenience constructor for explicit window parameters
impl Segmenter {
    pub fn with_windows(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self::new(&ChunkingConfig {
            max_tokens,
            overlap_tokens,
        })
    }
}
