// src/inference/track_filter.rs

use super::trajectory_store::Trajectory;
use crate::types::LaneInferenceConfig;
use tracing::debug;

/// Drops tracks too short (in time) or too sparse to describe a lane.
#[derive(Debug, Clone)]
pub struct TrackFilter {
    min_duration_seconds: f64,
    min_points: usize,
}

impl TrackFilter {
    pub fn new(min_duration_seconds: f64, min_points: usize) -> Self {
        Self {
            min_duration_seconds,
            min_points: min_points.max(2),
        }
    }

    pub fn from_config(config: &LaneInferenceConfig) -> Self {
        Self::new(config.min_track_duration_seconds, config.min_track_points)
    }

    pub fn accepts(&self, track: &Trajectory) -> bool {
        track.duration() >= self.min_duration_seconds && track.len() >= self.min_points
    }

    /// Split into (accepted, rejected), preserving input order.
    pub fn apply(&self, tracks: Vec<Trajectory>) -> (Vec<Trajectory>, Vec<Trajectory>) {
        let (accepted, rejected): (Vec<_>, Vec<_>) =
            tracks.into_iter().partition(|t| self.accepts(t));
        for t in &rejected {
            debug!(
                "Track {} filtered out: {:.2}s, {} points",
                t.track_id(),
                t.duration(),
                t.len()
            );
        }
        (accepted, rejected)
    }
}
