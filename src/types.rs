// src/types.rs

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lane_inference: LaneInferenceConfig,
    pub prediction: PredictionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneInferenceConfig {
    /// Tracks shorter than this (last − first timestamp) never become lanes
    pub min_track_duration_seconds: f64,
    /// Minimum observations per track; values below 2 are treated as 2
    pub min_track_points: usize,
    /// Symmetric Hausdorff distance at or below which two tracks share a lane
    pub hausdorff_threshold: f64,
    /// Candidate endpoints closer than this are snapped together
    pub endpoint_snap_tolerance: f64,
    /// Maximum deviation allowed when simplifying lane polylines
    pub simplify_tolerance: f64,
    /// Moving-average window (points)
    pub window_size: usize,
}

impl Default for LaneInferenceConfig {
    fn default() -> Self {
        Self {
            min_track_duration_seconds: 3.0,
            min_track_points: 5,
            hausdorff_threshold: 20.0,
            endpoint_snap_tolerance: 15.0,
            simplify_tolerance: 2.0,
            window_size: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Motion history kept per vehicle (seconds)
    pub past_history_seconds: f64,
    /// Forecast horizon (seconds)
    pub future_prediction_seconds: f64,
    /// Lanes farther than this from the vehicle are not candidates
    pub proximity_radius: f64,
    /// Distance under which the centerline boost applies
    pub near_centerline_threshold: f64,
    /// Forecasts are generated on frames where frame_index % cadence == 0
    pub prediction_cadence_frames: u64,
    /// Missed frames after which a vehicle is LOST and purged
    pub max_missed_frames: u32,
    /// Ranked paths kept per vehicle
    pub max_paths: usize,
    /// Vehicles slower than this (units/s) are not forecast
    pub min_speed: f64,
    /// History samples required before a vehicle is forecast
    pub min_history_points: usize,
    /// Position deltas averaged into the smoothed velocity
    pub velocity_deltas: usize,
    /// Position deltas used for the direction-consistency score
    pub consistency_deltas: usize,
    /// History span (samples) used for the movement direction
    pub direction_span: usize,
    /// Minimum displacement across `direction_span` for a usable direction
    pub min_direction_displacement: f64,
    /// Nearest lanes considered per vehicle
    pub max_candidate_lanes: usize,
    /// Candidates with |dot(direction, tangent)| below this are dropped
    pub min_alignment: f64,
    /// Candidates scoring below this are dropped
    pub min_probability: f64,
    /// Cap on the estimated travel distance
    pub max_travel_distance: f64,
    /// Points per generated path
    pub path_samples: usize,
    /// Generations blended per (vehicle, lane) pairing
    pub smoothing_generations: usize,
    /// Frames after which a generation is evicted
    pub max_prediction_age_frames: u64,
    /// Per-frame confidence decay factor, in (0, 1]
    pub confidence_decay: f64,
    pub weights: ScoringWeights,
    /// Length scale of the exp(−distance/scale) proximity term
    pub proximity_scale: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            past_history_seconds: 4.0,
            future_prediction_seconds: 2.0,
            proximity_radius: 50.0,
            near_centerline_threshold: 15.0,
            prediction_cadence_frames: 8,
            max_missed_frames: 20,
            max_paths: 3,
            min_speed: 0.5,
            min_history_points: 8,
            velocity_deltas: 3,
            consistency_deltas: 5,
            direction_span: 5,
            min_direction_displacement: 2.0,
            max_candidate_lanes: 4,
            min_alignment: 0.3,
            min_probability: 0.2,
            max_travel_distance: 120.0,
            path_samples: 8,
            smoothing_generations: 2,
            max_prediction_age_frames: 15,
            confidence_decay: 0.95,
            weights: ScoringWeights::default(),
            proximity_scale: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub alignment: f64,
    pub proximity: f64,
    pub consistency: f64,
    pub centerline: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            alignment: 0.4,
            proximity: 0.3,
            consistency: 0.15,
            centerline: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "lane_forecast=info".to_string(),
        }
    }
}

// ============================================================================
// OBSERVATIONS
// ============================================================================

/// One validated detection of a tracked vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub frame_index: u64,
    pub timestamp: f64,
    pub track_id: u64,
    pub center: Point,
    /// Box orientation in radians
    pub heading: f64,
    pub class_label: String,
}

/// All observations sharing one frame_index.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_index: u64,
    pub timestamp: f64,
    pub observations: Vec<Observation>,
}
