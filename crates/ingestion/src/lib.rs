//! Cityscope Ingestion
//!
//! Turns raw regulation text into indexable units:
//! - Token-window segmentation with configurable overlap
//! - Metadata attachment producing corpus records
//! - The chunk → embed → upsert indexing pipeline

pub mod pipeline;
pub mod segmenter;

pub use pipeline::{IngestReport, IngestionPipeline};
pub use segmenter::Segmenter;
