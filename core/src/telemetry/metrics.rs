use std::sync::Mutex;

/// Run counters shared by the driver across trails.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub edges_kept: usize,
    pub edges_evicted: usize,
    pub candidates_rejected: usize,
    pub trails_processed: usize,
    pub trails_failed: usize,
}

type Metrics = MetricsSnapshot;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_load(&self, loaded: usize, skipped: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.records_loaded += loaded;
            metrics.records_skipped += skipped;
        }
    }

    pub fn record_graph(&self, kept: usize, evicted: usize, rejected: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.edges_kept += kept;
            metrics.edges_evicted += evicted;
            metrics.candidates_rejected += rejected;
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.trails_processed += 1;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.trails_failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
