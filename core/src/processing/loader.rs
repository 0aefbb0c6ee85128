use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::interface::ImageDescriptor;
use crate::model::ImageRecord;
use crate::prelude::{PipelineStage, TrailError, TrailResult};
use crate::telemetry::log::LogManager;

/// A descriptor that was left out of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Output of the loader: valid records in enumeration order plus everything skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<ImageRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Reads `<id>.json` descriptors from an image directory.
///
/// Files are visited in file-name order, which is the order the sequencer
/// falls back on for images sharing a capture time.
pub struct RecordLoader {
    logger: LogManager,
}

impl RecordLoader {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("loader"),
        }
    }

    fn read_descriptor(path: &Path) -> Result<ImageDescriptor, String> {
        let contents = fs::read_to_string(path).map_err(|err| format!("unreadable: {err}"))?;
        serde_json::from_str(&contents).map_err(|err| format!("malformed: {err}"))
    }

    fn load_record(id: &str, path: &Path) -> Result<ImageRecord, String> {
        let descriptor = Self::read_descriptor(path)?;
        descriptor.into_record(id).map_err(|issue| issue.to_string())
    }
}

impl Default for RecordLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PipelineStage<&'a Path> for RecordLoader {
    type Output = LoadReport;

    fn name(&self) -> &'static str {
        "loader"
    }

    fn execute(&self, image_dir: &'a Path) -> TrailResult<LoadReport> {
        if !image_dir.is_dir() {
            return Err(TrailError::SourceNotFound(image_dir.to_path_buf()));
        }

        let mut report = LoadReport::default();
        let entries = WalkDir::new(image_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }
            let stem = path.file_stem().unwrap_or_default();
            let (id, outcome) = match stem.to_str() {
                Some(id) => (id.to_string(), Self::load_record(id, path)),
                None => (
                    stem.to_string_lossy().into_owned(),
                    Err("file name is not valid UTF-8".to_string()),
                ),
            };
            match outcome {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    self.logger
                        .caution(&format!("skipping image {id}: {reason}"));
                    report.skipped.push(SkippedRecord { id, reason });
                }
            }
        }

        self.logger.record(&format!(
            "loaded {} images, skipped {}",
            report.records.len(),
            report.skipped.len()
        ));
        Ok(report)
    }
}
