//! Scenario data model
//!
//! The types that flow through the pipeline: corpus records produced by
//! ingestion, parsed intents, vector matches, and the assembled packet that
//! the downstream generation service consumes.

use crate::DEFAULT_JURISDICTION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary string/number attributes carried alongside a record
pub type Metadata = Map<String, Value>;

/// One persisted chunk of the corpus file (one JSONL line)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Explicit id carried from upstream, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The chunk text
    pub text: String,

    /// Character length of the text
    pub char_length: usize,

    /// Token count under the active token scheme
    pub token_estimate: usize,

    /// Parent document metadata copied onto the chunk
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl CorpusRecord {
    /// Positional fallback id for the record at `ordinal` in a corpus
    pub fn fallback_id(source: &str, ordinal: usize) -> String {
        format!("{}-{}", source, ordinal)
    }
}

/// Parsed representation of a scenario query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioIntent {
    /// The query as received
    pub raw_query: String,

    /// Planning action (lower-cased), e.g. "pedestrianize"
    pub action: Option<String>,

    /// Street the scenario centres on
    pub primary_street: Option<String>,

    /// Starting cross street of the corridor
    pub from_cross: Option<String>,

    /// Ending cross street of the corridor
    pub to_cross: Option<String>,

    /// City the scenario applies to; defaulted when not captured
    pub jurisdiction: String,

    /// Named feature (bike lane, bus lane, ...) when the query mentions one
    pub feature: Option<String>,
}

impl ScenarioIntent {
    /// Intent for a query no rule matched: only the raw query and the
    /// default jurisdiction are populated
    pub fn unmatched(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            action: None,
            primary_street: None,
            from_cross: None,
            to_cross: None,
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
            feature: None,
        }
    }
}

/// One semantic search hit with its source text resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Identifier the hit was indexed under
    pub id: String,

    /// Similarity score, higher is better
    pub score: f32,

    /// Metadata stored with the vector
    pub metadata: Metadata,

    /// Full source text, or the not-available sentinel
    pub text: String,
}

/// Axis-aligned lat/lon bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialArea {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl SpatialArea {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Placeholder corridor box (Broadway midtown) used in place of real
    /// geocoding
    pub fn placeholder_corridor() -> Self {
        Self::new(40.7378, 40.7505, -73.9914, -73.9876)
    }

    /// Boundary-inclusive point containment
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Traffic counts selected for the area of interest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficSelection {
    /// Number of selected points
    pub count: usize,

    /// Selected point records, geometry stripped
    pub locations: Vec<Metadata>,

    /// min/max/mean per known numeric column
    pub summary: Map<String, Value>,
}

/// Per-category tallies plus fixed labels for the packet consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSummary {
    pub zoning_reference_count: usize,
    pub district_count: usize,
    pub traffic_location_count: usize,

    /// Sum of the three counts above
    pub total_data_points: usize,

    /// Fixed labels describing what the packet carries
    pub data_types: Vec<String>,

    /// Human-readable description of the area of interest
    pub geographic_scope: String,
}

/// The assembled context packet handed to the generation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPacket {
    /// Original query string
    pub query: String,

    /// Parsed intent
    pub parsed_components: ScenarioIntent,

    /// Ranked zoning references from semantic retrieval
    pub zoning_references: Vec<VectorMatch>,

    /// Zoning district records intersecting the area
    pub districts: Vec<Metadata>,

    /// Traffic counts within the area
    pub traffic: TrafficSelection,

    /// Counts and scope description
    pub data_summary: DataSummary,

    /// Advisory notes for the consumer
    pub notes: Vec<String>,

    /// When the packet was assembled
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_intent_defaults() {
        let intent = ScenarioIntent::unmatched("ribbit");
        assert_eq!(intent.jurisdiction, DEFAULT_JURISDICTION);
        assert!(intent.action.is_none());
        assert!(intent.primary_street.is_none());
        assert!(intent.feature.is_none());
    }

    #[test]
    fn test_fallback_id_format() {
        assert_eq!(CorpusRecord::fallback_id("zoning", 7), "zoning-7");
    }

    #[test]
    fn test_area_contains_is_boundary_inclusive() {
        let area = SpatialArea::new(40.0, 41.0, -74.0, -73.0);
        assert!(area.contains(40.0, -74.0));
        assert!(area.contains(41.0, -73.0));
        assert!(area.contains(40.5, -73.5));
        assert!(!area.contains(39.999, -73.5));
        assert!(!area.contains(40.5, -72.999));
    }

    #[test]
    fn test_corpus_record_roundtrip_keeps_flat_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), Value::String("zoning_text".into()));
        let record = CorpusRecord {
            id: Some("zoning-0".into()),
            text: "Floor area ratio limits".into(),
            char_length: 23,
            token_estimate: 4,
            metadata,
        };

        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"source\":\"zoning_text\""));

        let back: CorpusRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back.id.as_deref(), Some("zoning-0"));
        assert_eq!(back.metadata.get("source").unwrap(), "zoning_text");
    }
}
