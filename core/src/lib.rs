//! Sequencing and scene-graph core for 360° trail tours.
//!
//! A run loads per-image descriptors, orders them by capture time, smooths a
//! travel heading for each photo, links nearby photos into a pruned neighbor
//! graph, and assembles the result into a viewer sequence document.

pub mod config;
pub mod interface;
pub mod math;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use config::{ConfigLayers, SequenceConfig};
pub use prelude::{PipelineStage, TrailError, TrailResult};
