use crate::config::SequenceConfig;
use crate::math::{AngleHelper, GeodesicHelper};
use crate::model::{BearingRecord, ImageRecord};
use crate::prelude::{PipelineStage, TrailError, TrailResult};
use crate::telemetry::log::LogManager;

/// Consecutive images further apart than this are not trusted to show the
/// direction of travel.
pub const BEARING_DISTANCE_CUTOFF_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearingParams {
    pub flipped: bool,
    pub distance_cutoff_m: f64,
    pub prev_bearing_influence_cutoff_deg: f64,
}

impl BearingParams {
    pub fn from_config(config: &SequenceConfig, flipped: bool) -> Self {
        Self {
            flipped,
            distance_cutoff_m: BEARING_DISTANCE_CUTOFF_M,
            prev_bearing_influence_cutoff_deg: config.prev_bearing_influence_cutoff_deg,
        }
    }
}

/// Assigns each sequenced image a travel heading.
///
/// The heading points at the next image. Small direction changes are blended
/// with the previous heading to damp GPS jitter; changes at or beyond the
/// influence cutoff are taken as real turns. When the next image is too far
/// away, or there is no next image, the previous heading carries over.
pub struct BearingEstimator {
    params: BearingParams,
    geodesic: GeodesicHelper,
    logger: LogManager,
}

impl BearingEstimator {
    pub fn new(params: BearingParams) -> Self {
        Self {
            params,
            geodesic: GeodesicHelper::wgs84(),
            logger: LogManager::new("bearing"),
        }
    }

    fn heading_toward_next(
        &self,
        current: &ImageRecord,
        next: &ImageRecord,
    ) -> TrailResult<(f64, f64)> {
        let solution = self.geodesic.inverse(&current.fix, &next.fix)?;
        let mut azimuth = solution.azimuth_deg;
        if self.params.flipped {
            azimuth = AngleHelper::wrap360(azimuth + 180.0);
        }
        Ok((azimuth, solution.distance_m))
    }
}

impl<'a> PipelineStage<&'a [ImageRecord]> for BearingEstimator {
    type Output = Vec<BearingRecord>;

    fn name(&self) -> &'static str {
        "bearing"
    }

    fn execute(&self, records: &'a [ImageRecord]) -> TrailResult<Vec<BearingRecord>> {
        let n = records.len();
        if n < 2 {
            return Err(TrailError::InsufficientRecords(format!(
                "need at least two located images to derive headings, found {n}"
            )));
        }

        let mut headings: Vec<f64> = Vec::with_capacity(n);
        let mut turns = 0usize;
        let mut gaps = 0usize;

        for i in 0..n {
            if i == n - 1 {
                headings.push(headings[i - 1]);
                continue;
            }

            let (azimuth, distance) = self.heading_toward_next(&records[i], &records[i + 1])?;
            let heading = if distance <= self.params.distance_cutoff_m {
                match headings.last() {
                    None => azimuth,
                    Some(&previous) => {
                        let avg = AngleHelper::circular_mean(&[azimuth, previous])
                            .unwrap_or(azimuth);
                        // Signed on purpose: only the counter-direction is bounded.
                        let diff = AngleHelper::wrap180(azimuth - avg);
                        if diff < self.params.prev_bearing_influence_cutoff_deg {
                            avg
                        } else {
                            turns += 1;
                            azimuth
                        }
                    }
                }
            } else {
                gaps += 1;
                headings.last().copied().unwrap_or(azimuth)
            };
            headings.push(heading);
        }

        self.logger.record(&format!(
            "{n} headings, {turns} unsmoothed turns, {gaps} gaps over {} m",
            self.params.distance_cutoff_m
        ));

        Ok(records
            .iter()
            .zip(headings)
            .map(|(record, heading_deg)| BearingRecord {
                image_id: record.id.clone(),
                heading_deg,
            })
            .collect())
    }
}
