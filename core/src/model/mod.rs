pub mod record;
pub mod scene;

pub use record::{BearingRecord, GeoFix, ImageRecord};
pub use scene::{GraphStats, NeighborEdge, NeighborGraph, TileReference};
