use serde::{Deserialize, Serialize};

/// Multi-resolution tile set produced by the tiling tool for one image.
/// The core passes it through to the viewer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReference {
    #[serde(rename = "basePath")]
    pub base_path: String,
    #[serde(rename = "shtHash")]
    pub content_hash: String,
    pub path: String,
    #[serde(rename = "fallbackPath")]
    pub fallback_path: String,
    pub extension: String,
    #[serde(rename = "tileResolution")]
    pub tile_resolution: u32,
    #[serde(rename = "maxLevel")]
    pub max_level: u32,
    #[serde(rename = "cubeResolution")]
    pub cube_resolution: u32,
}

/// Directed link from one image to a neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEdge {
    pub from_id: String,
    pub to_id: String,
    /// Hotspot yaw in the viewer's frame, [0, 360).
    pub relative_bearing_deg: f64,
    pub distance_m: f64,
}

/// Pruning counters for one graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Pairs inside the distance cutoff.
    pub candidates: usize,
    /// Previously kept edges displaced by a better candidate.
    pub evicted: usize,
    /// Candidates dropped because an overlapping edge was closer to optimal.
    pub rejected: usize,
}

impl GraphStats {
    pub fn merge(&mut self, other: GraphStats) {
        self.candidates += other.candidates;
        self.evicted += other.evicted;
        self.rejected += other.rejected;
    }
}

/// Kept edges per image, one row per sequenced image in sequence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborGraph {
    pub rows: Vec<Vec<NeighborEdge>>,
    pub stats: GraphStats,
}

impl NeighborGraph {
    pub fn edge_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn row(&self, index: usize) -> &[NeighborEdge] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}
