// src/pipeline/metrics.rs
//
// Run counters for the prediction loop. Cloning shares the counters, so the
// feed reader and the frame loop can report into the same set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub records_accepted: Arc<AtomicU64>,
    pub records_rejected: Arc<AtomicU64>,
    pub vehicles_created: Arc<AtomicU64>,
    pub vehicles_lost: Arc<AtomicU64>,
    pub generations: Arc<AtomicU64>,
    pub predictions_emitted: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            records_accepted: Arc::new(AtomicU64::new(0)),
            records_rejected: Arc::new(AtomicU64::new(0)),
            vehicles_created: Arc::new(AtomicU64::new(0)),
            vehicles_lost: Arc::new(AtomicU64::new(0)),
            generations: Arc::new(AtomicU64::new(0)),
            predictions_emitted: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Keeps the most recent frame's processing time.
    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            vehicles_created: self.vehicles_created.load(Ordering::Relaxed),
            vehicles_lost: self.vehicles_lost.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            predictions_emitted: self.predictions_emitted.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub vehicles_created: u64,
    pub vehicles_lost: u64,
    pub generations: u64,
    pub predictions_emitted: u64,
    pub last_frame_us: u64,
    pub elapsed_secs: f64,
}
