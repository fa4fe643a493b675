//! Observability counters for the tick grid
//!
//! Counters are atomics so an exporter on another thread can read them
//! through a shared `Arc<GridMetrics>` while the ingestion path writes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::history::RingHistory;

/// Core metrics for one grid driver.
pub struct GridMetrics {
    pub observations_processed: AtomicU64,
    pub observations_rejected: AtomicU64,
    pub calibrations: AtomicU64,
    pub frames_projected: AtomicU64,
    pub recalculate_ns: Mutex<LatencyTracker>,
}

impl GridMetrics {
    pub fn new() -> Self {
        Self {
            observations_processed: AtomicU64::new(0),
            observations_rejected: AtomicU64::new(0),
            calibrations: AtomicU64::new(0),
            frames_projected: AtomicU64::new(0),
            recalculate_ns: Mutex::new(LatencyTracker::new(1000)),
        }
    }

    /// Record an observation turned into a row.
    pub fn record_observation(&self, latency_ns: u64, calibrated: bool) {
        self.observations_processed.fetch_add(1, Ordering::Relaxed);
        if calibrated {
            self.calibrations.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut tracker) = self.recalculate_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Record an update that was rejected before producing a row.
    pub fn record_rejected(&self) {
        self.observations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame handed to the renderer.
    pub fn record_frame(&self) {
        self.frames_projected.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics as a BTreeMap for Prometheus-style exposition.
    ///
    /// Latency keys are omitted until the first recalculation.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("observations_processed".to_string(), self.observations_processed.load(Ordering::Relaxed));
        m.insert("observations_rejected".to_string(), self.observations_rejected.load(Ordering::Relaxed));
        m.insert("calibrations".to_string(), self.calibrations.load(Ordering::Relaxed));
        m.insert("frames_projected".to_string(), self.frames_projected.load(Ordering::Relaxed));
        if let Ok(tracker) = self.recalculate_ns.lock() {
            m.insert("recalculate_samples".to_string(), tracker.count() as u64);
            if let (Some(p99), Some(avg)) = (tracker.percentile(99), tracker.average()) {
                m.insert("recalculate_p99_ns".to_string(), p99);
                m.insert("recalculate_avg_ns".to_string(), avg);
            }
        }
        m
    }
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling window of latency samples, oldest overwritten first.
pub struct LatencyTracker {
    samples: RingHistory<u64>,
}

impl LatencyTracker {
    pub fn new(window: usize) -> Self {
        Self {
            samples: RingHistory::new(window),
        }
    }

    pub fn record(&mut self, latency_ns: u64) {
        self.samples.push(latency_ns);
    }

    /// Nearest-rank percentile (0-100) over the window.
    pub fn percentile(&self, p: u8) -> Option<u64> {
        let mut sorted = self.samples.to_vec();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();
        let rank = (usize::from(p.min(100)) * sorted.len()).div_ceil(100).max(1);
        sorted.get(rank - 1).copied()
    }

    pub fn average(&self) -> Option<u64> {
        let count = self.samples.len() as u64;
        if count == 0 {
            return None;
        }
        Some(self.samples.iter().sum::<u64>() / count)
    }

    /// Samples currently in the window.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}
