pub mod assembler;
pub mod bearing;
pub mod loader;
pub mod neighbors;
pub mod sequencer;
pub mod tiles;

pub use assembler::{AssemblyInput, SceneAssembler, SceneParams};
pub use bearing::{BearingEstimator, BearingParams, BEARING_DISTANCE_CUTOFF_M};
pub use loader::{LoadReport, RecordLoader, SkippedRecord};
pub use neighbors::{NeighborGraphBuilder, NeighborParams};
pub use sequencer::Sequencer;
pub use tiles::{TileCatalog, TileCatalogLoader};
