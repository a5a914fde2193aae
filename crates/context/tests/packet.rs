//! End-to-end packet assembly against mock services and on-disk fixtures

use async_trait::async_trait;
use cityscope_common::config::AppConfig;
use cityscope_common::corpus;
use cityscope_common::embeddings::{Embedder, MockEmbedder};
use cityscope_common::errors::{AppError, Result};
use cityscope_common::index::{MockIndex, RawMatch};
use cityscope_common::models::Metadata;
use cityscope_common::TEXT_NOT_AVAILABLE;
use cityscope_context::PacketAssembler;
use cityscope_ingestion::Segmenter;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DISTRICTS_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"zonedist":"C5-3"},
   "geometry":{"type":"Polygon","coordinates":[[[-73.995,40.740],[-73.985,40.740],[-73.985,40.748],[-73.995,40.748],[-73.995,40.740]]]}},
  {"type":"Feature","properties":{"zonedist":"R3-2"},
   "geometry":{"type":"Polygon","coordinates":[[[-73.80,40.60],[-73.79,40.60],[-73.79,40.61],[-73.80,40.61],[-73.80,40.60]]]}}
]}"#;

const TRAFFIC_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"segment":"Broadway at 23rd","aadt":18000.0},
   "geometry":{"type":"Point","coordinates":[-73.989,40.741]}},
  {"type":"Feature","properties":{"segment":"Far Rockaway","aadt":4000.0},
   "geometry":{"type":"Point","coordinates":[-73.75,40.60]}}
]}"#;

/// Write corpus + spatial fixtures and a config pointing at them
fn fixtures(dir: &TempDir) -> AppConfig {
    // Small windows so the short fixture text yields several chunks
    let segmenter = Segmenter::with_windows(12, 2);
    let text = "Pedestrian plazas may be established within commercial \
                districts. Floor area ratio in C5 districts shall not \
                exceed fifteen. Street closures require a permit from the \
                department of transportation.";
    let chunks = segmenter.chunk(text).unwrap();
    let mut base = Metadata::new();
    base.insert("source".into(), "zoning_text".into());
    let records = segmenter.attach_metadata(&chunks, &base);
    corpus::write_corpus(&dir.path().join("corpus.jsonl"), &records).unwrap();

    fs::write(dir.path().join("districts.geojson"), DISTRICTS_GEOJSON).unwrap();
    fs::write(dir.path().join("traffic.geojson"), TRAFFIC_GEOJSON).unwrap();

    let mut config = AppConfig::default();
    config.data.data_dir = dir.path().to_path_buf();
    config.data.corpus_file = Path::new("corpus.jsonl").to_path_buf();
    config.data.districts_file = Path::new("districts.geojson").to_path_buf();
    config.data.traffic_file = Path::new("traffic.geojson").to_path_buf();
    config.retrieval.top_k = 5;
    config
}

fn hit(id: &str, score: f32) -> RawMatch {
    RawMatch {
        id: id.to_string(),
        score,
        metadata: Metadata::new(),
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::EmbeddingError {
            message: "service unreachable".to_string(),
        })
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::EmbeddingError {
            message: "service unreachable".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn packet_totals_and_intent_are_consistent() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(&dir);
    let index = Arc::new(MockIndex::new(vec![hit("zoning-0", 0.92), hit("vec_1", 0.81)]));
    let assembler = PacketAssembler::new(&config, Arc::new(MockEmbedder::new(8)), index);

    let packet = assembler
        .build_packet("pedestrianize Broadway from 14th to 34th in NYC")
        .await
        .unwrap();

    assert!(packet.parsed_components.action.is_some());
    assert_eq!(packet.parsed_components.primary_street.as_deref(), Some("Broadway"));
    assert_eq!(packet.parsed_components.jurisdiction, "NYC");

    // Zoning text resolved through both id schemes
    assert_eq!(packet.zoning_references.len(), 2);
    for reference in &packet.zoning_references {
        assert_ne!(reference.text, TEXT_NOT_AVAILABLE);
    }

    // Only the midtown district and traffic point fall in the corridor box
    assert_eq!(packet.districts.len(), 1);
    assert_eq!(packet.districts[0].get("zonedist").unwrap(), "C5-3");
    assert_eq!(packet.traffic.count, 1);
    assert_eq!(
        packet.traffic.locations[0].get("segment").unwrap(),
        "Broadway at 23rd"
    );

    let summary = &packet.data_summary;
    assert_eq!(
        summary.total_data_points,
        summary.zoning_reference_count + summary.district_count + summary.traffic_location_count
    );
    assert_eq!(summary.total_data_points, 4);
    assert!(summary.geographic_scope.contains("Broadway"));
    assert!(!packet.notes.is_empty());
}

#[tokio::test]
async fn packet_is_idempotent_for_unchanged_data() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(&dir);
    let index = Arc::new(MockIndex::new(vec![hit("zoning-0", 0.9)]));
    let assembler = PacketAssembler::new(&config, Arc::new(MockEmbedder::new(8)), index);

    let query = "add bike lane along 5th Avenue";
    let a = assembler.build_packet(query).await.unwrap();
    let b = assembler.build_packet(query).await.unwrap();

    assert_eq!(a.parsed_components, b.parsed_components);
    let ids = |p: &cityscope_common::models::ScenarioPacket| {
        p.zoning_references
            .iter()
            .map(|m| (m.id.clone(), m.text.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.data_summary.total_data_points, b.data_summary.total_data_points);
}

#[tokio::test]
async fn retrieval_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(&dir);
    let index = Arc::new(MockIndex::new(vec![]));
    let assembler = PacketAssembler::new(&config, Arc::new(FailingEmbedder), index);

    let err = assembler
        .build_packet("pedestrianize Broadway from 14th to 34th")
        .await
        .unwrap_err();
    assert!(err.is_external());
}

#[tokio::test]
async fn missing_spatial_data_degrades_to_empty() {
    let dir = TempDir::new().unwrap();
    let mut config = fixtures(&dir);
    config.data.districts_file = Path::new("missing_districts.geojson").to_path_buf();
    config.data.traffic_file = Path::new("missing_traffic.geojson").to_path_buf();

    let index = Arc::new(MockIndex::new(vec![hit("zoning-0", 0.9)]));
    let assembler = PacketAssembler::new(&config, Arc::new(MockEmbedder::new(8)), index);

    let packet = assembler
        .build_packet("close Canal Street between Bowery and Broadway")
        .await
        .unwrap();

    assert!(packet.districts.is_empty());
    assert_eq!(packet.traffic.count, 0);
    assert_eq!(packet.data_summary.total_data_points, 1);
}

#[tokio::test]
async fn packet_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let config = fixtures(&dir);
    let index = Arc::new(MockIndex::new(vec![hit("zoning-0", 0.9)]));
    let assembler = PacketAssembler::new(&config, Arc::new(MockEmbedder::new(8)), index);

    let packet = assembler
        .build_packet("what is the airspeed velocity of an unladen swallow")
        .await
        .unwrap();

    let json = serde_json::to_string(&packet).unwrap();
    assert!(json.contains("\"parsed_components\""));
    assert!(json.contains("\"data_summary\""));
    // unmatched query still yields a well-formed packet
    assert!(packet.parsed_components.action.is_none());
}
