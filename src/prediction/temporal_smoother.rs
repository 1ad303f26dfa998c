// src/prediction/temporal_smoother.rs
//
// Keeps the last few generations per (vehicle, lane) and blends them so the
// published paths do not jump every cadence tick.
//
//   points     = point-wise mean over the window (older paths resampled to
//                the newest one's point count)
//   confidence = mean window probability × decay^(frame − newest generation)
//
// A pairing whose newest generation is older than max_age is evicted.

use super::path_generator::PredictedPath;
use crate::geometry::{resample, Point};
use crate::types::PredictionConfig;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One published forecast; `rank` starts at 1 per vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    pub vehicle_id: u64,
    pub lane_id: String,
    pub rank: usize,
    pub probability: f64,
    pub points: Vec<Point>,
    pub generation_frame: u64,
}

pub struct TemporalSmoother {
    generations: usize,
    max_age: u64,
    decay: f64,
    max_paths: usize,
    pairings: BTreeMap<(u64, String), VecDeque<PredictedPath>>,
}

impl TemporalSmoother {
    pub fn new(generations: usize, max_age: u64, decay: f64, max_paths: usize) -> Self {
        Self {
            generations: generations.max(1),
            max_age,
            decay,
            max_paths,
            pairings: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &PredictionConfig) -> Self {
        Self::new(
            config.smoothing_generations,
            config.max_prediction_age_frames,
            config.confidence_decay,
            config.max_paths,
        )
    }

    /// Add one generation. A vehicle that produced paths this generation
    /// loses its pairings for lanes it no longer forecasts; a vehicle with
    /// no paths keeps its old ones to decay and expire.
    pub fn ingest(&mut self, paths: Vec<PredictedPath>) {
        let mut fresh: BTreeMap<u64, BTreeSet<&str>> = BTreeMap::new();
        for path in &paths {
            fresh
                .entry(path.vehicle_id)
                .or_default()
                .insert(path.lane_id.as_str());
        }
        self.pairings.retain(|(vehicle_id, lane_id), _| {
            fresh
                .get(vehicle_id)
                .map_or(true, |lanes| lanes.contains(lane_id.as_str()))
        });

        for path in paths {
            let window = self
                .pairings
                .entry((path.vehicle_id, path.lane_id.clone()))
                .or_default();
            window.push_back(path);
            while window.len() > self.generations {
                window.pop_front();
            }
        }
    }

    pub fn forget_vehicle(&mut self, vehicle_id: u64) {
        self.pairings.retain(|(v, _), _| *v != vehicle_id);
    }

    pub fn pairing_count(&self) -> usize {
        self.pairings.len()
    }

    /// Evict expired pairings, then publish the blended set for `frame`.
    pub fn current(&mut self, frame: u64) -> Vec<RankedPrediction> {
        let max_age = self.max_age;
        self.pairings.retain(|_, window| {
            window.retain(|p| frame.saturating_sub(p.generation_frame) <= max_age);
            !window.is_empty()
        });

        let mut by_vehicle: BTreeMap<u64, Vec<RankedPrediction>> = BTreeMap::new();
        for ((vehicle_id, lane_id), window) in &self.pairings {
            if let Some(blended) = self.blend(window, frame) {
                by_vehicle
                    .entry(*vehicle_id)
                    .or_default()
                    .push(RankedPrediction {
                        vehicle_id: *vehicle_id,
                        lane_id: lane_id.clone(),
                        rank: 0,
                        probability: blended.0,
                        points: blended.1,
                        generation_frame: blended.2,
                    });
            }
        }

        let mut out = Vec::new();
        for (_, mut predictions) in by_vehicle {
            predictions.sort_by(|a, b| {
                b.probability
                    .total_cmp(&a.probability)
                    .then_with(|| a.lane_id.cmp(&b.lane_id))
            });
            predictions.truncate(self.max_paths);
            for (i, p) in predictions.iter_mut().enumerate() {
                p.rank = i + 1;
            }
            out.extend(predictions);
        }
        out
    }

    /// (confidence, points, newest generation frame)
    fn blend(&self, window: &VecDeque<PredictedPath>, frame: u64) -> Option<(f64, Vec<Point>, u64)> {
        let newest = window.back()?;
        let n = newest.points.len();

        let mut sums = vec![Point::default(); n];
        for path in window {
            let points = if path.points.len() == n {
                path.points.clone()
            } else {
                resample(&path.points, n)
            };
            for (sum, p) in sums.iter_mut().zip(points.iter()) {
                *sum = *sum + *p;
            }
        }
        let scale = 1.0 / window.len() as f64;
        let points: Vec<Point> = sums.into_iter().map(|s| s * scale).collect();

        let mean_probability = window.iter().map(|p| p.probability).sum::<f64>() * scale;
        let age = frame.saturating_sub(newest.generation_frame);
        let confidence = mean_probability * self.decay.powi(age.min(i32::MAX as u64) as i32);
        Some((confidence.clamp(0.0, 1.0), points, newest.generation_frame))
    }
}
