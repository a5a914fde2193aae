//! Vector index abstraction
//!
//! Provides a unified interface over vector index providers:
//! - Pinecone-style serverless HTTP APIs
//! - An in-memory mock for tests
//!
//! Responses from vector services are loosely shaped (field names have
//! shifted across client generations), so every match passes through one
//! normalizer before any other code touches it.

use crate::config::IndexConfig;
use crate::errors::{AppError, Result};
use crate::models::Metadata;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One vector to upsert
#[derive(Debug, Clone, Serialize)]
pub struct UpsertRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// One normalized match from a vector query
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Metadata,
}

impl RawMatch {
    /// Normalize a single match object from a loosely shaped response.
    ///
    /// Accepts `id`/`_id`, `score`/`_score`, `metadata`/`fields`; a match
    /// with no recognizable id is dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value
            .get("id")
            .or_else(|| value.get("_id"))
            .and_then(Value::as_str)?
            .to_string();

        let score = value
            .get("score")
            .or_else(|| value.get("_score"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0) as f32;

        let metadata = value
            .get("metadata")
            .or_else(|| value.get("fields"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(Self {
            id,
            score,
            metadata,
        })
    }

    /// Extract the match list from a query response body.
    ///
    /// Newer APIs nest hits under `result.hits`; older ones use a top-level
    /// `matches` array.
    pub fn list_from_response(body: &Value) -> Vec<Self> {
        let hits = body
            .get("matches")
            .or_else(|| body.get("result").and_then(|r| r.get("hits")))
            .and_then(Value::as_array);

        hits.map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

/// Trait for vector index access
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert vectors into a namespace, returning the count written
    async fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> Result<usize>;

    /// Query the nearest neighbours of a vector within a namespace.
    /// Ordering is whatever the service returns (score-descending).
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RawMatch>>;
}

/// Pinecone-style serverless index client
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    host: String,
}

impl PineconeIndex {
    /// Create a new index client from configuration
    ///
    /// Fails fast when the API key or index host is absent.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "index.api_key not set".to_string(),
            })?;
        let host = config.host.clone().ok_or_else(|| AppError::Configuration {
            message: "index.host not set".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IndexError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::IndexError {
                message: format!("API error {}: {}", status, text),
            });
        }

        response.json().await.map_err(|e| AppError::IndexError {
            message: format!("Failed to parse response: {}", e),
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> Result<usize> {
        let count = records.len();
        let body = serde_json::json!({
            "vectors": records,
            "namespace": namespace,
        });
        self.post("vectors/upsert", body).await?;
        tracing::info!(namespace = namespace, count = count, "Vectors upserted");
        Ok(count)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RawMatch>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": include_metadata,
            "namespace": namespace,
        });
        let response = self.post("query", body).await?;
        let matches = RawMatch::list_from_response(&response);
        tracing::debug!(
            namespace = namespace,
            top_k = top_k,
            matches = matches.len(),
            "Vector query completed"
        );
        Ok(matches)
    }
}

/// In-memory mock index for testing
#[derive(Default)]
pub struct MockIndex {
    /// Matches returned by every query, in order
    matches: Vec<RawMatch>,
    /// Records captured by upsert calls
    upserted: std::sync::Mutex<Vec<UpsertRecord>>,
}

impl MockIndex {
    pub fn new(matches: Vec<RawMatch>) -> Self {
        Self {
            matches,
            upserted: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Ids of all records upserted so far
    pub fn upserted_ids(&self) -> Vec<String> {
        self.upserted
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for MockIndex {
    async fn upsert(&self, _namespace: &str, records: Vec<UpsertRecord>) -> Result<usize> {
        let count = records.len();
        self.upserted
            .lock()
            .expect("mock lock poisoned")
            .extend(records);
        Ok(count)
    }

    async fn query(
        &self,
        _namespace: &str,
        _vector: &[f32],
        top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<RawMatch>> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

/// Create a vector index client based on configuration
pub fn create_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.provider.as_str() {
        "pinecone" => Ok(Arc::new(PineconeIndex::from_config(config)?)),
        "mock" => Ok(Arc::new(MockIndex::default())),
        other => Err(AppError::Configuration {
            message: format!("Unknown index provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_classic_match_shape() {
        let value = json!({
            "id": "zoning-3",
            "score": 0.87,
            "metadata": {"source": "zoning_text"}
        });
        let m = RawMatch::from_value(&value).unwrap();
        assert_eq!(m.id, "zoning-3");
        assert!((m.score - 0.87).abs() < 1e-6);
        assert_eq!(m.metadata.get("source").unwrap(), "zoning_text");
    }

    #[test]
    fn test_normalize_alternate_field_names() {
        let value = json!({"_id": "vec_9", "_score": 0.5, "fields": {"text": "inline"}});
        let m = RawMatch::from_value(&value).unwrap();
        assert_eq!(m.id, "vec_9");
        assert_eq!(m.metadata.get("text").unwrap(), "inline");
    }

    #[test]
    fn test_match_without_id_is_dropped() {
        let value = json!({"score": 0.9});
        assert!(RawMatch::from_value(&value).is_none());
    }

    #[test]
    fn test_list_extraction_both_response_shapes() {
        let classic = json!({"matches": [{"id": "a", "score": 0.1}]});
        assert_eq!(RawMatch::list_from_response(&classic).len(), 1);

        let nested = json!({"result": {"hits": [{"_id": "b"}, {"_id": "c"}]}});
        assert_eq!(RawMatch::list_from_response(&nested).len(), 2);

        let empty = json!({"namespace": "zoning-nyc"});
        assert!(RawMatch::list_from_response(&empty).is_empty());
    }

    #[tokio::test]
    async fn test_mock_index_truncates_to_top_k() {
        let matches = (0..5)
            .map(|i| RawMatch {
                id: format!("zoning-{}", i),
                score: 1.0 - i as f32 * 0.1,
                metadata: Metadata::new(),
            })
            .collect();
        let index = MockIndex::new(matches);
        let hits = index.query("ns", &[0.0], 3, true).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "zoning-0");
    }

    #[test]
    fn test_pinecone_requires_host_and_key() {
        let config = IndexConfig::default();
        assert!(PineconeIndex::from_config(&config).is_err());
    }
}
