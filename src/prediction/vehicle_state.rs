// src/prediction/vehicle_state.rs
//
// Per-vehicle motion state for the prediction loop.
//
// State machine, one step per frame:
//   (first seen) → New → Active ⇄ Occluded → Lost (purged)
// A vehicle is Lost once it has gone MAX_MISSED_FRAMES frame indices without
// an observation. Occluded vehicles coast on their last velocity; history
// only ever holds observed positions.

use crate::geometry::Point;
use crate::types::{Observation, PredictionConfig};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

const CONSISTENCY_FALLBACK: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    New,
    Active,
    Occluded,
    Lost,
}

/// Motion estimation knobs lifted out of PredictionConfig.
#[derive(Debug, Clone)]
pub struct MotionParams {
    pub history_seconds: f64,
    pub velocity_deltas: usize,
    pub consistency_deltas: usize,
    pub direction_span: usize,
    pub min_direction_displacement: f64,
    pub max_missed_frames: u32,
}

impl From<&PredictionConfig> for MotionParams {
    fn from(config: &PredictionConfig) -> Self {
        Self {
            history_seconds: config.past_history_seconds,
            velocity_deltas: config.velocity_deltas,
            consistency_deltas: config.consistency_deltas,
            direction_span: config.direction_span,
            min_direction_displacement: config.min_direction_displacement,
            max_missed_frames: config.max_missed_frames,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VehicleState {
    pub track_id: u64,
    pub state: MotionState,
    /// Last observed position, or the extrapolated one while occluded
    pub position: Point,
    /// Units per second
    pub velocity: Point,
    /// 1 = steady heading, 0 = erratic
    pub consistency: f64,
    pub missed_frames: u32,
    pub class_label: String,
    history: VecDeque<(f64, Point)>,
    last_seen_frame: u64,
}

impl VehicleState {
    fn new(obs: &Observation) -> Self {
        let mut history = VecDeque::new();
        history.push_back((obs.timestamp, obs.center));
        Self {
            track_id: obs.track_id,
            state: MotionState::New,
            position: obs.center,
            velocity: Point::default(),
            consistency: CONSISTENCY_FALLBACK,
            missed_frames: 0,
            class_label: obs.class_label.clone(),
            history,
            last_seen_frame: obs.frame_index,
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &Point> {
        self.history.iter().map(|(_, p)| p)
    }

    /// Unit displacement over the last `span` history points, or None when the
    /// vehicle has not moved far enough to tell.
    pub fn direction(&self, span: usize, min_displacement: f64) -> Option<Point> {
        let n = self.history.len();
        if n < span.max(2) {
            return None;
        }
        let start = self.history[n - span.max(2)].1;
        let end = self.history[n - 1].1;
        let displacement = end - start;
        if displacement.norm() < min_displacement {
            return None;
        }
        displacement.normalized()
    }

    fn observe(&mut self, obs: &Observation, params: &MotionParams) {
        self.history.push_back((obs.timestamp, obs.center));
        while let Some(&(ts, _)) = self.history.front() {
            if obs.timestamp - ts > params.history_seconds {
                self.history.pop_front();
            } else {
                break;
            }
        }

        self.state = MotionState::Active;
        self.position = obs.center;
        self.missed_frames = 0;
        self.last_seen_frame = obs.frame_index;
        self.velocity = self.estimate_velocity(params.velocity_deltas).unwrap_or(self.velocity);
        self.consistency = self.estimate_consistency(params.consistency_deltas);
    }

    fn miss(&mut self, frame_index: u64, timestamp: f64) {
        self.missed_frames = frame_index
            .saturating_sub(self.last_seen_frame)
            .min(u32::MAX as u64) as u32;
        self.state = MotionState::Occluded;
        if let Some(&(seen_at, seen)) = self.history.back() {
            self.position = seen + self.velocity * (timestamp - seen_at).max(0.0);
        }
    }

    /// Recent (dt, delta) pairs, newest last. Pairs without elapsed time are skipped.
    fn recent_deltas(&self, count: usize) -> Vec<(f64, Point)> {
        let n = self.history.len();
        if n < 2 {
            return Vec::new();
        }
        let from = n.saturating_sub(count + 1);
        self.history
            .range(from..)
            .zip(self.history.range(from + 1..))
            .filter_map(|(&(t0, p0), &(t1, p1))| {
                let dt = t1 - t0;
                (dt > 0.0).then_some((dt, p1 - p0))
            })
            .collect()
    }

    fn estimate_velocity(&self, deltas: usize) -> Option<Point> {
        let recent = self.recent_deltas(deltas);
        if recent.is_empty() {
            return None;
        }
        let sum = recent
            .iter()
            .fold(Point::default(), |acc, &(dt, d)| acc + d * (1.0 / dt));
        Some(sum * (1.0 / recent.len() as f64))
    }

    /// Mean resultant length of recent unit headings.
    fn estimate_consistency(&self, deltas: usize) -> f64 {
        let units: Vec<Point> = self
            .recent_deltas(deltas)
            .into_iter()
            .filter_map(|(_, d)| d.normalized())
            .collect();
        if units.len() < 2 {
            return CONSISTENCY_FALLBACK;
        }
        let sum = units.iter().fold(Point::default(), |acc, u| acc + *u);
        (sum.norm() / units.len() as f64).clamp(0.0, 1.0)
    }
}

/// Vehicles that changed lifecycle during one update.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameUpdate {
    pub created: Vec<u64>,
    pub lost: Vec<u64>,
}

/// Owns every live VehicleState, keyed by track_id.
pub struct VehicleStateStore {
    params: MotionParams,
    vehicles: BTreeMap<u64, VehicleState>,
}

impl VehicleStateStore {
    pub fn new(params: MotionParams) -> Self {
        Self {
            params,
            vehicles: BTreeMap::new(),
        }
    }

    pub fn get(&self, track_id: u64) -> Option<&VehicleState> {
        self.vehicles.get(&track_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.values()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Apply one frame. Observations must already be validated and ordered.
    pub fn update(&mut self, frame_index: u64, timestamp: f64, observations: &[Observation]) -> FrameUpdate {
        let mut update = FrameUpdate::default();

        for obs in observations {
            match self.vehicles.get_mut(&obs.track_id) {
                Some(vehicle) => vehicle.observe(obs, &self.params),
                None => {
                    self.vehicles.insert(obs.track_id, VehicleState::new(obs));
                    update.created.push(obs.track_id);
                }
            }
        }

        let max_missed = self.params.max_missed_frames;
        for vehicle in self.vehicles.values_mut() {
            if vehicle.last_seen_frame == frame_index {
                continue;
            }
            vehicle.miss(frame_index, timestamp);
            if vehicle.missed_frames >= max_missed {
                vehicle.state = MotionState::Lost;
                update.lost.push(vehicle.track_id);
            }
        }

        for id in &update.lost {
            self.vehicles.remove(id);
            debug!("Vehicle {} lost after {} missed frames", id, max_missed);
        }
        update
    }
}
