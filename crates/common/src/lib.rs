//! Cityscope Common Library
//!
//! Shared code for the Cityscope pipeline crates including:
//! - Configuration management
//! - Error types and handling
//! - The scenario data model (intents, matches, packets)
//! - Corpus file I/O and id mapping
//! - Embedding client abstraction
//! - Vector index client abstraction

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use index::VectorIndex;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Default jurisdiction assumed when a query does not name one
pub const DEFAULT_JURISDICTION: &str = "New York, NY";

/// Sentinel stored on a match whose source text could not be resolved
pub const TEXT_NOT_AVAILABLE: &str = "Text content not available";
