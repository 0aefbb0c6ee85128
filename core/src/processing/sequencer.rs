use crate::model::ImageRecord;
use crate::prelude::{PipelineStage, TrailResult};
use crate::telemetry::log::LogManager;

/// Orders records by capture time.
///
/// The sort is stable: images sharing a timestamp stay in loader order.
/// Headings and the neighbor pruning both depend on this order.
pub struct Sequencer {
    logger: LogManager,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("sequencer"),
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage<Vec<ImageRecord>> for Sequencer {
    type Output = Vec<ImageRecord>;

    fn name(&self) -> &'static str {
        "sequencer"
    }

    fn execute(&self, mut records: Vec<ImageRecord>) -> TrailResult<Vec<ImageRecord>> {
        records.sort_by(|a, b| a.capture_time.cmp(&b.capture_time));
        if let (Some(first), Some(last)) = (records.first(), records.last()) {
            self.logger.detail(&format!(
                "{} images from {} to {}",
                records.len(),
                first.capture_time,
                last.capture_time
            ));
        }
        Ok(records)
    }
}
