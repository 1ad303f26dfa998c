// src/prediction/path_generator.rs

use super::probability_scorer::ScoredCandidate;
use crate::geometry::{dedup_consecutive, Point};
use crate::types::PredictionConfig;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedPath {
    pub vehicle_id: u64,
    pub lane_id: String,
    pub points: Vec<Point>,
    pub probability: f64,
    pub generation_frame: u64,
}

/// Walks a lane from the vehicle's projection for the distance it should
/// cover over the horizon. Paths end where the lane ends.
pub struct PathGenerator {
    horizon_seconds: f64,
    max_travel: f64,
    samples: usize,
}

impl PathGenerator {
    pub fn new(horizon_seconds: f64, max_travel: f64, samples: usize) -> Self {
        Self {
            horizon_seconds,
            max_travel,
            samples: samples.max(2),
        }
    }

    pub fn from_config(config: &PredictionConfig) -> Self {
        Self::new(
            config.future_prediction_seconds,
            config.max_travel_distance,
            config.path_samples,
        )
    }

    pub fn travel_distance(&self, speed: f64) -> f64 {
        (speed * self.horizon_seconds).clamp(0.0, self.max_travel)
    }

    pub fn generate(
        &self,
        vehicle_id: u64,
        speed: f64,
        candidate: &ScoredCandidate<'_>,
        generation_frame: u64,
    ) -> Option<PredictedPath> {
        let m = &candidate.lane_match;
        let lane = m.lane;
        let start = m.station;
        let end = (start + m.travel_sign * self.travel_distance(speed)).clamp(0.0, lane.length());

        let last = (self.samples - 1) as f64;
        let sampled: Vec<Point> = (0..self.samples)
            .map(|k| lane.point_at(start + (end - start) * k as f64 / last))
            .collect();
        let points = dedup_consecutive(&sampled);
        if points.len() < 2 {
            return None;
        }

        Some(PredictedPath {
            vehicle_id,
            lane_id: lane.id().to_string(),
            points,
            probability: candidate.probability,
            generation_frame,
        })
    }
}
