//! Error types for the Cityscope pipeline
//!
//! Provides one error taxonomy across the crates:
//! - Configuration errors fail fast at the point of use
//! - External service errors (embedding, vector index) are hard failures
//! - Per-record parse errors are skipped by callers, never raised here

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input validation
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Corpus file not found: {path}")]
    CorpusMissing { path: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Vector index error: {message}")]
    IndexError { message: String },

    #[error("Vector index timeout after {timeout_ms}ms")]
    IndexTimeout { timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by external services rather than local state
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingError { .. }
                | AppError::EmbeddingTimeout { .. }
                | AppError::IndexError { .. }
                | AppError::IndexTimeout { .. }
                | AppError::HttpClient(_)
        )
    }

    /// True for configuration problems that should fail fast
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. } | AppError::CorpusMissing { .. }
        )
    }
}
