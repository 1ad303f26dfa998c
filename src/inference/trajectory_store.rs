// src/inference/trajectory_store.rs
//
// Accumulates validated observations into one time-ordered trajectory per
// track. Appending is the only mutation; finalize() closes every track at
// batch end, so a truncated feed still yields its partial trajectories.

use crate::error::InputDataError;
use crate::geometry::Point;
use crate::types::Observation;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Trajectory {
    track_id: u64,
    points: Vec<Point>,
    timestamps: Vec<f64>,
}

impl Trajectory {
    pub fn new(track_id: u64) -> Self {
        Self {
            track_id,
            points: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Build directly from samples; timestamps must be strictly increasing.
    pub fn from_samples(
        track_id: u64,
        samples: impl IntoIterator<Item = (f64, Point)>,
    ) -> Result<Self, InputDataError> {
        let mut t = Self::new(track_id);
        for (ts, p) in samples {
            t.push(ts, p)?;
        }
        Ok(t)
    }

    pub fn push(&mut self, timestamp: f64, point: Point) -> Result<(), InputDataError> {
        if let Some(&last) = self.timestamps.last() {
            if timestamp <= last {
                return Err(InputDataError::NonIncreasingTimestamp {
                    track_id: self.track_id,
                    timestamp,
                    last_timestamp: last,
                });
            }
        }
        self.timestamps.push(timestamp);
        self.points.push(point);
        Ok(())
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// last_timestamp − first_timestamp (0 for fewer than two samples)
    pub fn duration(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct TrajectoryStore {
    tracks: BTreeMap<u64, Trajectory>,
    observations: usize,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, obs: &Observation) -> Result<(), InputDataError> {
        self.tracks
            .entry(obs.track_id)
            .or_insert_with(|| Trajectory::new(obs.track_id))
            .push(obs.timestamp, obs.center)?;
        self.observations += 1;
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn observation_count(&self) -> usize {
        self.observations
    }

    /// Close the batch. Trajectories come back ordered by track_id.
    pub fn finalize(self) -> Vec<Trajectory> {
        self.tracks.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(frame: u64, ts: f64, track: u64, x: f64) -> Observation {
        Observation {
            frame_index: frame,
            timestamp: ts,
            track_id: track,
            center: Point::new(x, 0.0),
            heading: 0.0,
            class_label: "car".to_string(),
        }
    }

    #[test]
    fn test_store_groups_by_track() {
        let mut store = TrajectoryStore::new();
        store.record(&obs(1, 0.0, 9, 0.0)).unwrap();
        store.record(&obs(1, 0.0, 2, 5.0)).unwrap();
        store.record(&obs(2, 0.5, 9, 1.0)).unwrap();
        store.record(&obs(3, 1.5, 9, 2.0)).unwrap();

        assert_eq!(store.track_count(), 2);
        assert_eq!(store.observation_count(), 4);

        let tracks = store.finalize();
        assert_eq!(tracks[0].track_id(), 2);
        assert_eq!(tracks[1].track_id(), 9);
        assert_eq!(tracks[1].len(), 3);
        assert!((tracks[1].duration() - 1.5).abs() < 1e-12);
        assert_eq!(tracks[0].duration(), 0.0);
    }

    #[test]
    fn test_non_increasing_timestamp_rejected() {
        let mut store = TrajectoryStore::new();
        store.record(&obs(1, 1.0, 4, 0.0)).unwrap();
        assert!(matches!(
            store.record(&obs(2, 1.0, 4, 1.0)),
            Err(InputDataError::NonIncreasingTimestamp { track_id: 4, .. })
        ));
        assert_eq!(store.observation_count(), 1);
        assert_eq!(store.finalize()[0].len(), 1);
    }
}
