pub mod angles;
pub mod geodesic;

pub use angles::AngleHelper;
pub use geodesic::{GeodesicHelper, GeodesicSolution};
