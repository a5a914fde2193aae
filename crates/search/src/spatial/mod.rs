//! Spatial filtering
//!
//! Selects structured geographic records for an area of interest. Districts
//! are kept on any overlap with the bounding box; traffic points must lie
//! within it (boundary-inclusive). Spatial data is best-effort enrichment:
//! a missing or unreadable dataset yields empty results, never an error.

use cityscope_common::models::{Metadata, SpatialArea, TrafficSelection};
use geo::{coord, Intersects, Polygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Numeric traffic columns summarized when present
const TRAFFIC_STAT_COLUMNS: &[&str] = &["volume", "aadt", "hourly_volume"];

/// Upper bound on traffic locations carried in a selection
const MAX_TRAFFIC_LOCATIONS: usize = 200;

/// Filters GeoJSON datasets against a bounding box
#[derive(Clone)]
pub struct SpatialFilter {
    districts_path: PathBuf,
    traffic_path: PathBuf,
}

impl SpatialFilter {
    pub fn new(districts_path: PathBuf, traffic_path: PathBuf) -> Self {
        Self {
            districts_path,
            traffic_path,
        }
    }

    /// Zoning districts whose geometry intersects the area (partial
    /// overlap included). Geometry is stripped from the returned records.
    pub fn districts_in(&self, area: &SpatialArea) -> Vec<Metadata> {
        let Some(collection) = load_feature_collection(&self.districts_path) else {
            return Vec::new();
        };

        let bbox = bounding_polygon(area);
        let mut selected = Vec::new();

        for feature in &collection.features {
            let Some(geometry) = feature_geometry(feature) else {
                continue;
            };
            if bbox.intersects(&geometry) {
                selected.push(feature_properties(feature));
            }
        }

        debug!(
            total = collection.features.len(),
            selected = selected.len(),
            "Districts filtered"
        );
        selected
    }

    /// Traffic count points within the area, boundary-inclusive, plus
    /// min/max/mean summaries over known numeric columns. At most
    /// `MAX_TRAFFIC_LOCATIONS` records are carried.
    pub fn traffic_counts_in(&self, area: &SpatialArea) -> TrafficSelection {
        let Some(collection) = load_feature_collection(&self.traffic_path) else {
            return TrafficSelection::default();
        };

        let mut locations = Vec::new();
        for feature in &collection.features {
            let Some((lon, lat)) = point_coordinates(feature) else {
                continue;
            };
            if area.contains(lat, lon) {
                locations.push(feature_properties(feature));
            }
        }
        locations.truncate(MAX_TRAFFIC_LOCATIONS);

        let summary = summarize_columns(&locations);
        debug!(
            total = collection.features.len(),
            selected = locations.len(),
            "Traffic points filtered"
        );
        TrafficSelection {
            count: locations.len(),
            locations,
            summary,
        }
    }
}

/// Axis-aligned bounding polygon from the area's four scalar bounds
fn bounding_polygon(area: &SpatialArea) -> Polygon<f64> {
    Rect::new(
        coord! { x: area.min_lon, y: area.min_lat },
        coord! { x: area.max_lon, y: area.max_lat },
    )
    .to_polygon()
}

/// Load a GeoJSON FeatureCollection, degrading to None on any failure
fn load_feature_collection(path: &Path) -> Option<FeatureCollection> {
    if !path.exists() {
        warn!(path = %path.display(), "Spatial dataset not found");
        return None;
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read spatial dataset");
            return None;
        }
    };
    match raw.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => Some(collection),
        Ok(_) => {
            warn!(path = %path.display(), "Spatial dataset is not a FeatureCollection");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse spatial dataset");
            None
        }
    }
}

/// Convert a feature's geometry, skipping malformed ones with a warning
fn feature_geometry(feature: &Feature) -> Option<geo::Geometry<f64>> {
    let geometry = feature.geometry.as_ref()?;
    match geo::Geometry::<f64>::try_from(geometry.value.clone()) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            warn!(error = %e, "Skipping feature with malformed geometry");
            None
        }
    }
}

/// Extract (lon, lat) from a point feature; non-points are skipped
fn point_coordinates(feature: &Feature) -> Option<(f64, f64)> {
    match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(position) if position.len() >= 2 => {
            Some((position[0], position[1]))
        }
        _ => None,
    }
}

/// Feature attributes without the raw geometry, serialization-friendly
fn feature_properties(feature: &Feature) -> Metadata {
    feature.properties.clone().unwrap_or_default()
}

/// min/max/mean per known numeric column across the selected records
fn summarize_columns(locations: &[Metadata]) -> Map<String, Value> {
    let mut summary = Map::new();
    summary.insert("num_points".into(), Value::from(locations.len()));

    for column in TRAFFIC_STAT_COLUMNS {
        let values: Vec<f64> = locations
            .iter()
            .filter_map(|props| props.get(*column).and_then(Value::as_f64))
            .collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        summary.insert(
            (*column).to_string(),
            serde_json::json!({ "min": min, "max": max, "mean": mean }),
        );
    }
    summary
}
