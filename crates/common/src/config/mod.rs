//! Configuration management for Cityscope
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Dataset locations
    #[serde(default)]
    pub data: DataConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_external_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Index provider: pinecone, mock
    #[serde(default = "default_index_provider")]
    pub provider: String,

    /// API key for the vector index service
    pub api_key: Option<String>,

    /// Index host URL (serverless index endpoint)
    pub host: Option<String>,

    /// Logical index name
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Request timeout in seconds
    #[serde(default = "default_external_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours to request
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Namespace holding the zoning corpus
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Source label used for positional fallback ids ("{source}-{ordinal}")
    #[serde(default = "default_corpus_source")]
    pub corpus_source: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk window
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens shared between consecutive windows
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Root data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Corpus file (newline-delimited JSON), relative to data_dir
    #[serde(default = "default_corpus_file")]
    pub corpus_file: PathBuf,

    /// Zoning districts GeoJSON, relative to data_dir
    #[serde(default = "default_districts_file")]
    pub districts_file: PathBuf,

    /// Traffic counts GeoJSON, relative to data_dir
    #[serde(default = "default_traffic_file")]
    pub traffic_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-large".to_string() }
fn default_embedding_dimension() -> usize { 3072 }
fn default_external_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 100 }
fn default_index_provider() -> String { "pinecone".to_string() }
fn default_index_name() -> String { "cityscope-zoning".to_string() }
fn default_top_k() -> usize { 8 }
fn default_namespace() -> String { "zoning-nyc".to_string() }
fn default_corpus_source() -> String { "zoning".to_string() }
fn default_max_tokens() -> usize { 800 }
fn default_overlap_tokens() -> usize { 100 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_corpus_file() -> PathBuf { PathBuf::from("zoning/zoning_chunks.jsonl") }
fn default_districts_file() -> PathBuf { PathBuf::from("zoning/zoning_districts.geojson") }
fn default_traffic_file() -> PathBuf { PathBuf::from("traffic/traffic_counts.geojson") }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_service_name() -> String { "cityscope".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__TOP_K=10
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the embedding request timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    /// Get the vector index request timeout as Duration
    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index.timeout_secs)
    }

    /// Absolute path of the corpus file
    pub fn corpus_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.corpus_file)
    }

    /// Absolute path of the zoning districts GeoJSON
    pub fn districts_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.districts_file)
    }

    /// Absolute path of the traffic counts GeoJSON
    pub fn traffic_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.traffic_file)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_external_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            api_key: None,
            host: None,
            name: default_index_name(),
            timeout_secs: default_external_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            namespace: default_namespace(),
            corpus_source: default_corpus_source(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            corpus_file: default_corpus_file(),
            districts_file: default_districts_file(),
            traffic_file: default_traffic_file(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            chunking: ChunkingConfig::default(),
            data: DataConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.namespace, "zoning-nyc");
        assert_eq!(config.embedding.model, "text-embedding-3-large");
    }

    #[test]
    fn test_data_paths() {
        let config = AppConfig::default();
        assert_eq!(
            config.corpus_path(),
            PathBuf::from("data/zoning/zoning_chunks.jsonl")
        );
        assert!(config.traffic_path().starts_with("data"));
    }

    #[test]
    fn test_timeouts() {
        let config = AppConfig::default();
        assert_eq!(config.embedding_timeout(), Duration::from_secs(30));
        assert_eq!(config.index_timeout(), Duration::from_secs(30));
    }
}
