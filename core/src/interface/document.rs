use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::{BearingRecord, ImageRecord, TileReference};
use crate::prelude::TrailResult;

/// Written to `sequence.json` and loaded by the panorama viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceDocument {
    /// Build identifier, fresh for every assembly.
    #[serde(rename = "sequenceID")]
    pub sequence_id: String,
    #[serde(rename = "viewerConfig")]
    pub viewer_config: ViewerConfig,
}

impl SequenceDocument {
    pub fn to_json(&self) -> TrailResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerConfig {
    pub default: ViewerDefaults,
    /// Emitted as an object keyed by scene id, in sequence order.
    #[serde(serialize_with = "scenes_by_id")]
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerDefaults {
    pub first_scene: String,
    pub scene_fade_duration: f64,
    pub compass: bool,
    pub auto_load: bool,
    pub show_controls: bool,
}

/// Panorama type understood by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanoramaKind {
    #[serde(rename = "multires")]
    MultiRes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(skip)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub horizon_pitch: f64,
    pub hfov: f64,
    pub yaw: f64,
    pub north_offset: f64,
    #[serde(rename = "type")]
    pub kind: PanoramaKind,
    pub multi_res: TileReference,
    pub hot_spots: Vec<Hotspot>,
}

/// Keeps the viewer's current pitch/yaw/fov when following a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetView {
    #[serde(rename = "same")]
    Same,
}

/// Hotspot action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HotspotKind {
    #[serde(rename = "scene")]
    Scene,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub pitch: f64,
    pub yaw: f64,
    pub css_class: String,
    #[serde(rename = "type")]
    pub kind: HotspotKind,
    pub target_pitch: TargetView,
    pub target_yaw: TargetView,
    pub target_hfov: TargetView,
    pub scene_id: String,
}

fn scenes_by_id<S: Serializer>(scenes: &[Scene], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(scenes.len()))?;
    for scene in scenes {
        map.serialize_entry(&scene.id, scene)?;
    }
    map.end()
}

/// `bearing_sequence.json`: heading per image id, in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BearingSequenceDocument {
    #[serde(serialize_with = "bearings_by_id")]
    pub bearing_sequence: Vec<BearingRecord>,
}

impl BearingSequenceDocument {
    pub fn new(bearings: &[BearingRecord]) -> Self {
        Self {
            bearing_sequence: bearings.to_vec(),
        }
    }
}

fn bearings_by_id<S: Serializer>(
    bearings: &[BearingRecord],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(bearings.len()))?;
    for bearing in bearings {
        map.serialize_entry(&bearing.image_id, &bearing.heading_deg)?;
    }
    map.end()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: f64,
}

/// `geo_sequence.json`: position and heading of every image, in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoSequenceDocument {
    pub geo_sequence: Vec<GeoPoint>,
}

impl GeoSequenceDocument {
    pub fn new(records: &[ImageRecord], bearings: &[BearingRecord]) -> Self {
        let geo_sequence = records
            .iter()
            .zip(bearings)
            .map(|(record, bearing)| GeoPoint {
                id: record.id.clone(),
                latitude: record.fix.latitude,
                longitude: record.fix.longitude,
                bearing: bearing.heading_deg,
            })
            .collect();
        Self { geo_sequence }
    }
}

/// One located image in the cross-trail index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMasterPoint {
    pub sequence: String,
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: f64,
}

/// `geo_master.json`: every image of every trail in a batch, tagged with its trail name.
///
/// Coordinates and bearings are rounded to 6 decimals; points on the zero
/// sentinel are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoMasterDocument {
    pub geo_data: Vec<GeoMasterPoint>,
}

impl GeoMasterDocument {
    pub fn push_trail(&mut self, sequence: &str, geo: &GeoSequenceDocument) {
        let points = geo
            .geo_sequence
            .iter()
            .filter(|point| point.latitude != 0.0 && point.longitude != 0.0)
            .map(|point| GeoMasterPoint {
                sequence: sequence.to_string(),
                id: point.id.clone(),
                latitude: round6(point.latitude),
                longitude: round6(point.longitude),
                bearing: round6(point.bearing),
            });
        self.geo_data.extend(points);
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
