use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::SequenceConfig;
use crate::math::{AngleHelper, GeodesicHelper};
use crate::model::{BearingRecord, GraphStats, ImageRecord, NeighborEdge, NeighborGraph};
use crate::prelude::{PipelineStage, TrailError, TrailResult};
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborParams {
    pub distance_cutoff_m: f64,
    pub prune_angle_deg: f64,
    pub optimal_distance_m: f64,
}

impl NeighborParams {
    pub fn from_config(config: &SequenceConfig) -> Self {
        Self {
            distance_cutoff_m: config.neighbor_distance_cutoff_m,
            prune_angle_deg: config.neighbor_prune_angle_deg,
            optimal_distance_m: config.optimal_neighbor_distance_m,
        }
    }
}

/// Links every image to the nearby images it should offer as hotspots.
///
/// Candidates are visited in sequence order and pruned greedily: within one
/// angular sector only the edge whose length is closest to the optimal
/// distance survives. The result depends on visiting order, so each row is
/// always scanned front to back. Rows do not depend on each other and are
/// built on a pool of `workers` threads.
pub struct NeighborGraphBuilder {
    params: NeighborParams,
    workers: usize,
    geodesic: GeodesicHelper,
    logger: LogManager,
}

enum Admission {
    Rejected,
    Accepted { evicted: usize },
}

impl NeighborGraphBuilder {
    pub fn new(params: NeighborParams) -> Self {
        Self {
            params,
            workers: 1,
            geodesic: GeodesicHelper::wgs84(),
            logger: LogManager::new("neighbors"),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Kept edges of image `from`, in the order they were admitted.
    pub fn build_row(
        &self,
        from: usize,
        records: &[ImageRecord],
        bearings: &[BearingRecord],
    ) -> TrailResult<(Vec<NeighborEdge>, GraphStats)> {
        let origin = &records[from];
        let heading = bearings[from].heading_deg;
        let mut kept: Vec<NeighborEdge> = Vec::new();
        let mut stats = GraphStats::default();

        for (to, target) in records.iter().enumerate() {
            if to == from {
                continue;
            }
            let solution = self.geodesic.inverse(&origin.fix, &target.fix)?;
            if solution.distance_m > self.params.distance_cutoff_m {
                continue;
            }
            stats.candidates += 1;

            // Hotspot yaw is measured from the back of the panorama, hence the half turn.
            let relative = AngleHelper::wrap360(
                AngleHelper::wrap360(solution.azimuth_deg - heading) + 180.0,
            );
            let candidate = NeighborEdge {
                from_id: origin.id.clone(),
                to_id: target.id.clone(),
                relative_bearing_deg: relative,
                distance_m: solution.distance_m,
            };
            match self.admit(&mut kept, candidate) {
                Admission::Rejected => stats.rejected += 1,
                Admission::Accepted { evicted } => stats.evicted += evicted,
            }
        }

        Ok((kept, stats))
    }

    fn admit(&self, kept: &mut Vec<NeighborEdge>, candidate: NeighborEdge) -> Admission {
        let optimal = self.params.optimal_distance_m;
        let candidate_error = (optimal - candidate.distance_m).abs();
        let mut beaten = Vec::new();

        for (index, existing) in kept.iter().enumerate() {
            let gap = AngleHelper::separation(
                candidate.relative_bearing_deg,
                existing.relative_bearing_deg,
            );
            if gap >= self.params.prune_angle_deg {
                continue;
            }
            if candidate_error < (optimal - existing.distance_m).abs() {
                beaten.push(index);
            } else {
                return Admission::Rejected;
            }
        }

        let evicted = beaten.len();
        let mut index = 0;
        kept.retain(|_| {
            let keep = !beaten.contains(&index);
            index += 1;
            keep
        });
        kept.push(candidate);
        Admission::Accepted { evicted }
    }
}

impl<'a> PipelineStage<(&'a [ImageRecord], &'a [BearingRecord])> for NeighborGraphBuilder {
    type Output = NeighborGraph;

    fn name(&self) -> &'static str {
        "neighbors"
    }

    fn execute(
        &self,
        (records, bearings): (&'a [ImageRecord], &'a [BearingRecord]),
    ) -> TrailResult<NeighborGraph> {
        if records.len() != bearings.len() {
            return Err(TrailError::Internal(format!(
                "{} records but {} bearings",
                records.len(),
                bearings.len()
            )));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|err| TrailError::Internal(format!("neighbor worker pool: {err}")))?;
        // Indexed collect keeps rows in sequence order.
        let rows = pool.install(|| {
            (0..records.len())
                .into_par_iter()
                .map(|from| self.build_row(from, records, bearings))
                .collect::<TrailResult<Vec<_>>>()
        })?;

        let mut graph = NeighborGraph::default();
        for (row, stats) in rows {
            graph.stats.merge(stats);
            graph.rows.push(row);
        }

        self.logger.record(&format!(
            "{} edges kept from {} candidates ({} evicted, {} rejected) on {} worker(s)",
            graph.edge_count(),
            graph.stats.candidates,
            graph.stats.evicted,
            graph.stats.rejected,
            self.workers
        ));
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoFix;
    use crate::processing::bearing::tests::walk;
    use crate::processing::bearing::{BearingEstimator, BearingParams};
    use chrono::NaiveDate;

    fn params(prune: f64) -> NeighborParams {
        NeighborParams {
            distance_cutoff_m: 20.0,
            prune_angle_deg: prune,
            optimal_distance_m: 10.0,
        }
    }

    fn record(id: &str, latitude: f64, longitude: f64) -> ImageRecord {
        let time = NaiveDate::from_ymd_opt(2022, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        ImageRecord::new(id, time, GeoFix { latitude, longitude })
    }

    /// Point `meters` away from (lat, lon) along `azimuth`, flat-earth approximation.
    fn offset(latitude: f64, longitude: f64, azimuth: f64, meters: f64) -> (f64, f64) {
        let radians = azimuth.to_radians();
        (
            latitude + meters * radians.cos() / 110_574.0,
            longitude + meters * radians.sin() / 111_319.49,
        )
    }

    fn north_facing(records: &[ImageRecord]) -> Vec<BearingRecord> {
        records
            .iter()
            .map(|r| BearingRecord {
                image_id: r.id.clone(),
                heading_deg: 0.0,
            })
            .collect()
    }

    /// Origin facing north with candidates at hotspot yaw 10 (8 m) and 15 (15 m).
    fn sector_fixture(near_first: bool) -> Vec<ImageRecord> {
        let (lat, lon) = (0.001, 0.001);
        // yaw = azimuth - heading + 180, so azimuth = yaw + 180 for a north heading
        let near = offset(lat, lon, 190.0, 8.0);
        let far = offset(lat, lon, 195.0, 15.0);
        let origin = record("origin", lat, lon);
        let near = record("near", near.0, near.1);
        let far = record("far", far.0, far.1);
        if near_first {
            vec![origin, near, far]
        } else {
            vec![origin, far, near]
        }
    }

    #[test]
    fn closer_to_optimal_wins_the_sector_in_either_order() {
        for near_first in [true, false] {
            let records = sector_fixture(near_first);
            let bearings = north_facing(&records);
            let builder = NeighborGraphBuilder::new(params(20.0));
            let (row, stats) = builder.build_row(0, &records, &bearings).unwrap();

            assert_eq!(row.len(), 1, "near_first={near_first}");
            assert_eq!(row[0].to_id, "near");
            assert!((row[0].relative_bearing_deg - 10.0).abs() < 0.1);
            assert!((row[0].distance_m - 8.0).abs() < 0.2);
            assert_eq!(stats.candidates, 2);
            if near_first {
                assert_eq!(stats.rejected, 1);
            } else {
                assert_eq!(stats.evicted, 1);
            }
        }
    }

    #[test]
    fn distinct_sectors_are_both_kept() {
        let (lat, lon) = (0.001, 0.001);
        let east = offset(lat, lon, 90.0, 9.0);
        let west = offset(lat, lon, 270.0, 12.0);
        let records = vec![
            record("origin", lat, lon),
            record("east", east.0, east.1),
            record("west", west.0, west.1),
        ];
        let bearings = north_facing(&records);
        let (row, _) = NeighborGraphBuilder::new(params(20.0))
            .build_row(0, &records, &bearings)
            .unwrap();
        let targets: Vec<&str> = row.iter().map(|e| e.to_id.as_str()).collect();
        assert_eq!(targets, vec!["east", "west"]);
        // east of a north-facing image shows up at yaw 270 in the viewer frame
        assert!((row[0].relative_bearing_deg - 270.0).abs() < 0.1);
        assert!((row[1].relative_bearing_deg - 90.0).abs() < 0.1);
    }

    #[test]
    fn worse_candidate_leaves_kept_edge_alone() {
        let (lat, lon) = (0.001, 0.001);
        let first = offset(lat, lon, 180.0, 10.0);
        let second = offset(lat, lon, 182.0, 14.0);
        let records = vec![
            record("origin", lat, lon),
            record("first", first.0, first.1),
            record("second", second.0, second.1),
        ];
        let bearings = north_facing(&records);
        let (row, stats) = NeighborGraphBuilder::new(params(20.0))
            .build_row(0, &records, &bearings)
            .unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].to_id, "first");
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.evicted, 0);
    }

    #[test]
    fn candidate_losing_one_overlap_evicts_nothing() {
        // kept: "a" at yaw 0 (14 m), "b" at yaw 25 (10.5 m); "c" at yaw 12 (12 m)
        // beats "a" but loses to "b", so it is dropped and "a" stays.
        let (lat, lon) = (0.001, 0.001);
        let a = offset(lat, lon, 180.0, 14.0);
        let b = offset(lat, lon, 205.0, 10.5);
        let c = offset(lat, lon, 192.0, 12.0);
        let records = vec![
            record("origin", lat, lon),
            record("a", a.0, a.1),
            record("b", b.0, b.1),
            record("c", c.0, c.1),
        ];
        let bearings = north_facing(&records);
        let (row, stats) = NeighborGraphBuilder::new(params(20.0))
            .build_row(0, &records, &bearings)
            .unwrap();

        let targets: Vec<&str> = row.iter().map(|e| e.to_id.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(row[0].relative_bearing_deg.min(360.0 - row[0].relative_bearing_deg) < 0.1);
        assert!((row[1].relative_bearing_deg - 25.0).abs() < 0.1);
        assert_eq!(
            stats,
            GraphStats {
                candidates: 3,
                evicted: 0,
                rejected: 1,
            }
        );
    }

    #[test]
    fn candidates_beyond_cutoff_are_ignored() {
        let (lat, lon) = (0.001, 0.001);
        let far = offset(lat, lon, 45.0, 25.0);
        let records = vec![record("origin", lat, lon), record("far", far.0, far.1)];
        let bearings = north_facing(&records);
        let graph = NeighborGraphBuilder::new(params(20.0))
            .execute((records.as_slice(), bearings.as_slice()))
            .unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.rows.len(), 2);
    }

    fn zigzag_trail() -> (Vec<ImageRecord>, Vec<BearingRecord>) {
        let steps: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let azimuth = if (i / 5) % 2 == 0 { 60.0 } else { 120.0 };
                (azimuth + (i % 3) as f64 * 7.0, 3.0 + (i % 4) as f64)
            })
            .collect();
        let records = walk(&steps);
        let bearings = BearingEstimator::new(BearingParams {
            flipped: false,
            distance_cutoff_m: 10.0,
            prev_bearing_influence_cutoff_deg: 45.0,
        })
        .execute(records.as_slice())
        .unwrap();
        (records, bearings)
    }

    #[test]
    fn kept_edges_never_share_a_sector() {
        let (records, bearings) = zigzag_trail();
        let prune = 25.0;
        let graph = NeighborGraphBuilder::new(params(prune))
            .execute((records.as_slice(), bearings.as_slice()))
            .unwrap();
        assert!(graph.edge_count() > 0);
        for row in &graph.rows {
            for (i, a) in row.iter().enumerate() {
                for b in &row[i + 1..] {
                    let gap =
                        AngleHelper::separation(a.relative_bearing_deg, b.relative_bearing_deg);
                    assert!(
                        gap >= prune,
                        "{} -> {} and {} overlap",
                        a.from_id,
                        a.to_id,
                        b.to_id
                    );
                }
            }
        }
    }

    #[test]
    fn parallel_rows_match_sequential_rows() {
        let (records, bearings) = zigzag_trail();
        let sequential = NeighborGraphBuilder::new(params(25.0))
            .execute((records.as_slice(), bearings.as_slice()))
            .unwrap();
        for workers in [2, 3, 8, 64] {
            let parallel = NeighborGraphBuilder::new(params(25.0))
                .with_workers(workers)
                .execute((records.as_slice(), bearings.as_slice()))
                .unwrap();
            assert_eq!(parallel, sequential, "workers={workers}");
        }
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let (records, bearings) = zigzag_trail();
        let err = NeighborGraphBuilder::new(params(25.0))
            .execute((records.as_slice(), &bearings[1..]))
            .unwrap_err();
        assert!(matches!(err, TrailError::Internal(_)));
    }
}
