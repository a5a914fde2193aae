//! Cityscope Search
//!
//! The three retrieval-side components:
//! - Intent parsing (ordered rule scan over scenario grammar)
//! - Semantic retrieval with id-to-text resolution
//! - Spatial filtering of GeoJSON datasets

pub mod intent;
pub mod retrieval;
pub mod spatial;

pub use intent::IntentParser;
pub use retrieval::SemanticRetriever;
pub use spatial::SpatialFilter;
