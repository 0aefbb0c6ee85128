use uuid::Uuid;

use crate::config::SequenceConfig;
use crate::interface::{
    Hotspot, HotspotKind, PanoramaKind, Scene, SequenceDocument, TargetView, ViewerConfig,
    ViewerDefaults,
};
use crate::model::{BearingRecord, ImageRecord, NeighborEdge, NeighborGraph};
use crate::prelude::{PipelineStage, TrailError, TrailResult};
use crate::processing::tiles::TileCatalog;
use crate::telemetry::log::LogManager;

const HOTSPOT_CSS_CLASS: &str = "custom-hotspot";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneParams {
    pub flipped: bool,
    pub fade_duration_ms: f64,
    pub show_compass: bool,
    pub horizon_correction_deg: f64,
    pub hfov_deg: f64,
    pub show_title: bool,
    pub arrow_pitch_deg: f64,
}

impl SceneParams {
    pub fn from_config(config: &SequenceConfig, flipped: bool) -> Self {
        Self {
            flipped,
            fade_duration_ms: config.fade_duration_ms,
            show_compass: config.show_compass,
            horizon_correction_deg: config.horizon_correction_deg,
            hfov_deg: config.hfov_deg,
            show_title: config.show_title,
            arrow_pitch_deg: config.arrow_pitch_deg,
        }
    }
}

/// Everything the assembler merges, aligned by sequence index.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub records: &'a [ImageRecord],
    pub bearings: &'a [BearingRecord],
    pub graph: &'a NeighborGraph,
    pub tiles: &'a TileCatalog,
}

/// Builds the viewer document for one trail.
///
/// Each call stamps a new random `sequenceID`; two assemblies of the same
/// input differ only in that field.
pub struct SceneAssembler {
    params: SceneParams,
    logger: LogManager,
}

impl SceneAssembler {
    pub fn new(params: SceneParams) -> Self {
        Self {
            params,
            logger: LogManager::new("assembler"),
        }
    }

    fn hotspot(&self, edge: &NeighborEdge) -> Hotspot {
        Hotspot {
            pitch: self.params.arrow_pitch_deg,
            yaw: edge.relative_bearing_deg,
            css_class: HOTSPOT_CSS_CLASS.to_string(),
            kind: HotspotKind::Scene,
            target_pitch: TargetView::Same,
            target_yaw: TargetView::Same,
            target_hfov: TargetView::Same,
            scene_id: edge.to_id.clone(),
        }
    }

    fn scene(&self, input: &AssemblyInput<'_>, index: usize) -> TrailResult<Scene> {
        let record = &input.records[index];
        let tile = input
            .tiles
            .get(&record.id)
            .ok_or_else(|| TrailError::MissingTile(record.id.clone()))?;

        let (horizon_pitch, yaw) = if self.params.flipped {
            (-self.params.horizon_correction_deg, 0.0)
        } else {
            (self.params.horizon_correction_deg, 180.0)
        };

        Ok(Scene {
            id: record.id.clone(),
            title: self.params.show_title.then(|| record.id.clone()),
            horizon_pitch,
            hfov: self.params.hfov_deg,
            yaw,
            north_offset: input.bearings[index].heading_deg,
            kind: PanoramaKind::MultiRes,
            multi_res: tile.clone(),
            hot_spots: input
                .graph
                .row(index)
                .iter()
                .map(|edge| self.hotspot(edge))
                .collect(),
        })
    }
}

impl<'a> PipelineStage<AssemblyInput<'a>> for SceneAssembler {
    type Output = SequenceDocument;

    fn name(&self) -> &'static str {
        "assembler"
    }

    fn execute(&self, input: AssemblyInput<'a>) -> TrailResult<SequenceDocument> {
        let first = input.records.first().ok_or_else(|| {
            TrailError::InsufficientRecords("no located images to build scenes from".into())
        })?;
        if input.bearings.len() != input.records.len() {
            return Err(TrailError::Internal(format!(
                "{} records but {} bearings",
                input.records.len(),
                input.bearings.len()
            )));
        }

        let scenes = (0..input.records.len())
            .map(|index| self.scene(&input, index))
            .collect::<TrailResult<Vec<_>>>()?;

        let document = SequenceDocument {
            sequence_id: Uuid::new_v4().simple().to_string(),
            viewer_config: ViewerConfig {
                default: ViewerDefaults {
                    first_scene: first.id.clone(),
                    scene_fade_duration: self.params.fade_duration_ms,
                    compass: self.params.show_compass,
                    auto_load: true,
                    show_controls: false,
                },
                scenes,
            },
        };

        self.logger.record(&format!(
            "sequence {} with {} scenes",
            document.sequence_id,
            document.viewer_config.scenes.len()
        ));
        Ok(document)
    }
}
