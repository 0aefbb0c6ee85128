use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use trailcore::interface::{
    BearingSequenceDocument, GeoMasterDocument, GeoSequenceDocument, SequenceDocument,
};
use trailcore::processing::{
    AssemblyInput, BearingEstimator, BearingParams, NeighborGraphBuilder, NeighborParams,
    RecordLoader, SceneAssembler, SceneParams, Sequencer, TileCatalogLoader,
};
use trailcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use trailcore::{PipelineStage, TrailError};

pub const SEQUENCE_FILE: &str = "sequence.json";
pub const BEARING_SEQUENCE_FILE: &str = "bearing_sequence.json";
pub const GEO_SEQUENCE_FILE: &str = "geo_sequence.json";
pub const GEO_MASTER_FILE: &str = "geo_master.json";

/// Documents produced for one trail, before anything is written.
#[derive(Debug)]
pub struct TrailArtifacts {
    pub sequence: SequenceDocument,
    pub bearings: BearingSequenceDocument,
    pub geo: GeoSequenceDocument,
    pub skipped: usize,
    pub edges: usize,
}

#[derive(Debug)]
pub struct TrailOutcome {
    pub trail: PathBuf,
    pub sequence_id: String,
    pub scenes: usize,
    pub edges: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed: Vec<TrailOutcome>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
    cancelled: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares a flag that, once set, stops the run at the next stage boundary.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn checkpoint(&self, next: &'static str) -> anyhow::Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(TrailError::Cancelled(next).into());
        }
        Ok(())
    }

    /// Runs every stage for one trail directory without touching the disk beyond reads.
    pub fn build(&self, trail_dir: &Path, base_path: &str) -> anyhow::Result<TrailArtifacts> {
        let image_dir = trail_dir.join("img");
        if !image_dir.is_dir() {
            return Err(TrailError::SourceNotFound(image_dir).into());
        }
        let sequence_config = self.config.resolve_for(trail_dir)?;
        let flipped = self.config.flipped;

        self.checkpoint("loader")?;
        let report = RecordLoader::new()
            .execute(image_dir.as_path())
            .context("executing loader stage")?;
        self.metrics
            .record_load(report.records.len(), report.skipped.len());

        let records = Sequencer::new()
            .execute(report.records)
            .context("executing sequencer stage")?;

        self.checkpoint("bearing")?;
        let bearings = BearingEstimator::new(BearingParams::from_config(&sequence_config, flipped))
            .execute(records.as_slice())
            .context("executing bearing stage")?;

        self.checkpoint("neighbors")?;
        let graph = NeighborGraphBuilder::new(NeighborParams::from_config(&sequence_config))
            .with_workers(self.config.workers)
            .execute((records.as_slice(), bearings.as_slice()))
            .context("executing neighbor stage")?;
        self.metrics
            .record_graph(graph.edge_count(), graph.stats.evicted, graph.stats.rejected);

        self.checkpoint("assembler")?;
        let tiles = TileCatalogLoader::new(&image_dir, base_path)
            .load(&records)
            .context("resolving tile descriptors")?;
        let sequence = SceneAssembler::new(SceneParams::from_config(&sequence_config, flipped))
            .execute(AssemblyInput {
                records: &records,
                bearings: &bearings,
                graph: &graph,
                tiles: &tiles,
            })
            .context("executing assembler stage")?;

        Ok(TrailArtifacts {
            bearings: BearingSequenceDocument::new(&bearings),
            geo: GeoSequenceDocument::new(&records, &bearings),
            sequence,
            skipped: report.skipped.len(),
            edges: graph.edge_count(),
        })
    }

    /// Builds one trail and writes `sequence.json` (plus the geo exports when enabled).
    pub fn execute(&self, trail_dir: &Path, base_path: &str) -> anyhow::Result<TrailOutcome> {
        self.execute_trail(trail_dir, base_path).map(|(outcome, _)| outcome)
    }

    fn execute_trail(
        &self,
        trail_dir: &Path,
        base_path: &str,
    ) -> anyhow::Result<(TrailOutcome, GeoSequenceDocument)> {
        let artifacts = self.build(trail_dir, base_path)?;

        let sequence_path = trail_dir.join(SEQUENCE_FILE);
        let contents = artifacts
            .sequence
            .to_json()
            .context("serializing sequence document")?;
        fs::write(&sequence_path, contents)
            .with_context(|| format!("writing {}", sequence_path.display()))?;
        if self.config.export_geo {
            write_document(&trail_dir.join(BEARING_SEQUENCE_FILE), &artifacts.bearings)?;
            write_document(&trail_dir.join(GEO_SEQUENCE_FILE), &artifacts.geo)?;
        }
        self.metrics.record_processed();

        let outcome = TrailOutcome {
            trail: trail_dir.to_path_buf(),
            sequence_id: artifacts.sequence.sequence_id.clone(),
            scenes: artifacts.sequence.viewer_config.scenes.len(),
            edges: artifacts.edges,
            skipped: artifacts.skipped,
        };
        info!(
            "{} -> sequence {} ({} scenes, {} hotspots, {} skipped)",
            outcome.trail.display(),
            outcome.sequence_id,
            outcome.scenes,
            outcome.edges,
            outcome.skipped
        );
        Ok((outcome, artifacts.geo))
    }

    /// Processes every trail directory under `root`; a failing trail does not stop the batch.
    ///
    /// With geo export enabled, the located images of all completed trails are
    /// also collected into `<root>/geo_master.json`.
    pub fn execute_batch(&self, root: &Path, base_path: &str) -> anyhow::Result<BatchOutcome> {
        if !root.is_dir() {
            return Err(TrailError::SourceNotFound(root.to_path_buf()).into());
        }
        let mut trails: Vec<PathBuf> = fs::read_dir(root)
            .with_context(|| format!("listing trails in {}", root.display()))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        trails.sort();

        let prefix = base_path.trim_end_matches('/');
        let mut outcome = BatchOutcome::default();
        let mut master = GeoMasterDocument::default();
        for trail in trails {
            self.checkpoint("next trail")?;
            let name = trail
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let trail_base = format!("{prefix}/{name}");
            match self.execute_trail(&trail, &trail_base) {
                Ok((done, geo)) => {
                    master.push_trail(&name, &geo);
                    outcome.completed.push(done);
                }
                Err(err) => {
                    error!("trail {} failed: {err:#}", trail.display());
                    self.metrics.record_error();
                    outcome.failed.push((trail, format!("{err:#}")));
                }
            }
        }

        if self.config.export_geo {
            write_document(&root.join(GEO_MASTER_FILE), &master)?;
            info!(
                "{} images from {} trails indexed in {GEO_MASTER_FILE}",
                master.geo_data.len(),
                outcome.completed.len()
            );
        }
        Ok(outcome)
    }
}

fn write_document<T: serde::Serialize>(path: &Path, document: &T) -> anyhow::Result<()> {
    let contents = serde_json::to_string(document)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{write_synthetic_trail, TrailProfile};
    use crate::workflow::config::tests::GLOBAL_YAML;
    use tempfile::tempdir;
    use trailcore::config::SettingsTier;

    fn runner(export_geo: bool, workers: usize) -> Runner {
        let global = serde_yaml::from_str(GLOBAL_YAML).unwrap();
        Runner::new(WorkflowConfig::from_tier(global, false, export_geo, workers))
    }

    fn profile(seed: u64) -> TrailProfile {
        TrailProfile {
            images: 30,
            unlocated: 2,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn runner_executes_workflow() {
        let trail = tempdir().unwrap();
        let written = write_synthetic_trail(trail.path(), &profile(3)).unwrap();

        let runner = runner(true, 2);
        let outcome = runner.execute(trail.path(), "/trails/demo/").unwrap();
        assert_eq!(outcome.scenes, 30);
        assert_eq!(outcome.skipped, 2);
        assert!(outcome.edges > 0);

        let sequence: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(trail.path().join(SEQUENCE_FILE)).unwrap())
                .unwrap();
        let first = &written.located[0];
        assert_eq!(sequence["viewerConfig"]["default"]["firstScene"], first.as_str());
        assert_eq!(
            sequence["viewerConfig"]["scenes"][first]["multiRes"]["basePath"],
            format!("/trails/demo/img/{first}")
        );
        assert!(trail.path().join(BEARING_SEQUENCE_FILE).is_file());
        assert!(trail.path().join(GEO_SEQUENCE_FILE).is_file());

        let metrics = runner.metrics();
        assert_eq!(metrics.records_loaded, 30);
        assert_eq!(metrics.records_skipped, 2);
        assert_eq!(metrics.trails_processed, 1);
    }

    #[test]
    fn repeated_builds_differ_only_in_sequence_id() {
        let trail = tempdir().unwrap();
        write_synthetic_trail(trail.path(), &profile(11)).unwrap();

        let first = runner(false, 1).build(trail.path(), "/t").unwrap();
        let second = runner(false, 4).build(trail.path(), "/t").unwrap();
        assert_ne!(first.sequence.sequence_id, second.sequence.sequence_id);
        assert_eq!(first.sequence.viewer_config, second.sequence.viewer_config);
        assert_eq!(first.bearings, second.bearings);
    }

    #[test]
    fn last_two_headings_match() {
        let trail = tempdir().unwrap();
        write_synthetic_trail(trail.path(), &profile(5)).unwrap();
        let artifacts = runner(false, 1).build(trail.path(), "/t").unwrap();
        let points = &artifacts.geo.geo_sequence;
        let n = points.len();
        assert_eq!(points[n - 1].bearing, points[n - 2].bearing);
    }

    #[test]
    fn missing_image_directory_fails_fast() {
        let trail = tempdir().unwrap();
        let err = runner(false, 1).execute(trail.path(), "/t").unwrap_err();
        let source = err.downcast_ref::<TrailError>();
        assert!(matches!(source, Some(TrailError::SourceNotFound(_))), "{err:#}");
    }

    #[test]
    fn missing_image_directory_is_reported_before_settings() {
        let trail = tempdir().unwrap();
        let empty = WorkflowConfig::from_tier(SettingsTier::new(), false, false, 1);
        let unconfigured = Runner::new(empty);
        let err = unconfigured.execute(trail.path(), "/t").unwrap_err();
        let source = err.downcast_ref::<TrailError>();
        assert!(matches!(source, Some(TrailError::SourceNotFound(_))), "{err:#}");
    }

    #[test]
    fn missing_tiles_abort_the_trail() {
        let trail = tempdir().unwrap();
        let written = write_synthetic_trail(trail.path(), &profile(9)).unwrap();
        fs::remove_dir_all(trail.path().join("img").join(&written.located[4])).unwrap();
        let err = runner(false, 1).execute(trail.path(), "/t").unwrap_err();
        assert!(format!("{err:#}").contains(&written.located[4]));
        assert!(!trail.path().join(SEQUENCE_FILE).exists());
    }

    #[test]
    fn batch_continues_past_a_broken_trail() {
        let root = tempdir().unwrap();
        write_synthetic_trail(&root.path().join("a-trail"), &profile(1)).unwrap();
        fs::create_dir_all(root.path().join("b-broken")).unwrap();
        write_synthetic_trail(&root.path().join("c-trail"), &profile(2)).unwrap();

        let runner = runner(false, 2);
        let outcome = runner.execute_batch(root.path(), "/trails/").unwrap();
        assert_eq!(outcome.completed.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].0.ends_with("b-broken"));
        assert!(root.path().join("c-trail").join(SEQUENCE_FILE).is_file());
        assert_eq!(runner.metrics().trails_failed, 1);
        assert!(!root.path().join(GEO_MASTER_FILE).exists());
    }

    #[test]
    fn batch_with_geo_export_writes_master_index() {
        let root = tempdir().unwrap();
        let first = write_synthetic_trail(&root.path().join("a-trail"), &profile(1)).unwrap();
        fs::create_dir_all(root.path().join("b-broken")).unwrap();
        write_synthetic_trail(&root.path().join("c-trail"), &profile(2)).unwrap();

        let outcome = runner(true, 2).execute_batch(root.path(), "/trails").unwrap();
        assert_eq!(outcome.completed.len(), 2);

        let master: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(root.path().join(GEO_MASTER_FILE)).unwrap(),
        )
        .unwrap();
        let points = master["geo_data"].as_array().unwrap();
        assert_eq!(points.len(), 60);
        assert_eq!(points[0]["sequence"], "a-trail");
        assert_eq!(points[0]["id"], first.located[0].as_str());
        assert_eq!(points[59]["sequence"], "c-trail");
        for point in points {
            let latitude = point["latitude"].as_f64().unwrap();
            assert!(((latitude * 1e6).round() - latitude * 1e6).abs() < 1e-6);
            assert!(point["bearing"].is_number());
        }
    }

    #[test]
    fn cancellation_stops_before_the_next_stage() {
        let trail = tempdir().unwrap();
        write_synthetic_trail(trail.path(), &profile(4)).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let err = runner(false, 1)
            .with_cancel_flag(flag)
            .execute(trail.path(), "/t")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrailError>(),
            Some(TrailError::Cancelled(_))
        ));
    }
}
