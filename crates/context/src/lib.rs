//! Cityscope Context Engine
//!
//! Assembles the scenario packet consumed by the downstream generation
//! stage: parsed intent, semantically retrieved zoning references, and
//! spatially filtered district/traffic records merged into one document.

pub mod assembler;

pub use assembler::PacketAssembler;
