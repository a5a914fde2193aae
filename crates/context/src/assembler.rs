//! Scenario packet assembly
//!
//! Orchestrates the pipeline for one query: intent parsing first, then
//! semantic retrieval and spatial filtering concurrently, then the merge.
//! Retrieval failure is fatal (it is the primary product), spatial failure
//! degrades to empty enrichment.

use chrono::Utc;
use cityscope_common::config::AppConfig;
use cityscope_common::embeddings::Embedder;
use cityscope_common::errors::Result;
use cityscope_common::index::VectorIndex;
use cityscope_common::models::{
    DataSummary, Metadata, ScenarioIntent, ScenarioPacket, SpatialArea, TrafficSelection,
};
use cityscope_search::{IntentParser, SemanticRetriever, SpatialFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Fixed advisory notes carried on every packet
const PACKET_NOTES: &[&str] = &[
    "This packet is a condensed context for LLM reasoning. Geometries are simplified for payload size.",
    "The area of interest is a placeholder corridor bounding box; street geocoding is not applied.",
];

/// Labels describing the packet's data categories
const DATA_TYPE_LABELS: &[&str] = &["zoning_regulations", "zoning_districts", "traffic_counts"];

/// Builds scenario packets from raw queries
pub struct PacketAssembler {
    parser: IntentParser,
    retriever: SemanticRetriever,
    spatial: Arc<SpatialFilter>,
    top_k: usize,
    namespace: String,
    spatial_timeout: Duration,
}

impl PacketAssembler {
    /// Wire the assembler from configuration plus injected service clients
    pub fn new(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let retriever = SemanticRetriever::new(
            embedder,
            index,
            config.corpus_path(),
            config.retrieval.corpus_source.clone(),
            config.embedding_timeout(),
        );
        let spatial = Arc::new(SpatialFilter::new(
            config.districts_path(),
            config.traffic_path(),
        ));

        Self {
            parser: IntentParser::new(),
            retriever,
            spatial,
            top_k: config.retrieval.top_k,
            namespace: config.retrieval.namespace.clone(),
            spatial_timeout: config.index_timeout(),
        }
    }

    /// Build the context packet for one scenario query.
    ///
    /// Intent parsing runs first because the intent is embedded in the
    /// packet regardless of the other steps. Retrieval and spatial
    /// filtering have no data dependency on each other and run joined.
    #[instrument(skip(self))]
    pub async fn build_packet(&self, query: &str) -> Result<ScenarioPacket> {
        info!("Building scenario packet");

        let intent = self.parser.parse(query);

        // Placeholder corridor in place of real geocoding
        let area = SpatialArea::placeholder_corridor();

        let retrieval = self.retriever.search(query, self.top_k, &self.namespace);
        let spatial = self.filter_area(area);
        let (zoning, (districts, traffic)) = tokio::join!(retrieval, spatial);

        // Primary product: a failed retrieval fails the packet
        let zoning = zoning?;

        let data_summary = summarize(&zoning, &districts, &traffic, &intent, &area);

        info!(
            zoning = zoning.len(),
            districts = districts.len(),
            traffic = traffic.count,
            "Scenario packet built"
        );
        Ok(ScenarioPacket {
            query: query.to_string(),
            parsed_components: intent,
            zoning_references: zoning,
            districts,
            traffic,
            data_summary,
            notes: PACKET_NOTES.iter().map(|s| s.to_string()).collect(),
            generated_at: Utc::now(),
        })
    }

    /// Run both spatial selections off the async runtime, degrading to
    /// empty results on timeout or join failure.
    async fn filter_area(&self, area: SpatialArea) -> (Vec<Metadata>, TrafficSelection) {
        let filter = Arc::clone(&self.spatial);
        let task = tokio::task::spawn_blocking(move || {
            (
                filter.districts_in(&area),
                filter.traffic_counts_in(&area),
            )
        });

        match timeout(self.spatial_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "Spatial filter task failed; continuing without spatial data");
                (Vec::new(), TrafficSelection::default())
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.spatial_timeout.as_millis() as u64,
                    "Spatial filter timed out; continuing without spatial data"
                );
                (Vec::new(), TrafficSelection::default())
            }
        }
    }
}

/// Counts, fixed labels, and the human-readable scope string
fn summarize(
    zoning: &[cityscope_common::models::VectorMatch],
    districts: &[Metadata],
    traffic: &TrafficSelection,
    intent: &ScenarioIntent,
    area: &SpatialArea,
) -> DataSummary {
    let geographic_scope = match &intent.primary_street {
        Some(street) => format!(
            "{} corridor in {} (lat {:.4}..{:.4}, lon {:.4}..{:.4})",
            street, intent.jurisdiction, area.min_lat, area.max_lat, area.min_lon, area.max_lon
        ),
        None => format!(
            "{} (lat {:.4}..{:.4}, lon {:.4}..{:.4})",
            intent.jurisdiction, area.min_lat, area.max_lat, area.min_lon, area.max_lon
        ),
    };

    DataSummary {
        zoning_reference_count: zoning.len(),
        district_count: districts.len(),
        traffic_location_count: traffic.count,
        total_data_points: zoning.len() + districts.len() + traffic.count,
        data_types: DATA_TYPE_LABELS.iter().map(|s| s.to_string()).collect(),
        geographic_scope,
    }
}
