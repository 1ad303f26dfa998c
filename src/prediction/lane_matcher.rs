// src/prediction/lane_matcher.rs

use crate::geometry::Point;
use crate::lane_map::{Lane, LaneMap};
use crate::types::PredictionConfig;

/// A lane near a vehicle, with the local geometry at the closest point.
#[derive(Debug, Clone)]
pub struct LaneMatch<'a> {
    pub lane: &'a Lane,
    pub closest_point: Point,
    pub distance: f64,
    /// Arc length of `closest_point` along the lane
    pub station: f64,
    pub tangent: Point,
    /// |dot(direction, tangent)|, in [0, 1]
    pub alignment: f64,
    /// +1 when the vehicle moves with the polyline order, −1 against it
    pub travel_sign: f64,
}

pub struct LaneMatcher {
    proximity_radius: f64,
    max_candidates: usize,
    min_alignment: f64,
}

impl LaneMatcher {
    pub fn new(proximity_radius: f64, max_candidates: usize, min_alignment: f64) -> Self {
        Self {
            proximity_radius,
            max_candidates,
            min_alignment,
        }
    }

    pub fn from_config(config: &PredictionConfig) -> Self {
        Self::new(
            config.proximity_radius,
            config.max_candidate_lanes,
            config.min_alignment,
        )
    }

    /// Lanes within the proximity radius, nearest first. The nearest
    /// `max_candidates` are considered; poorly aligned ones are then dropped.
    /// An empty result is a normal outcome.
    pub fn find<'a>(&self, lanes: &'a LaneMap, position: Point, direction: Point) -> Vec<LaneMatch<'a>> {
        let mut matches: Vec<LaneMatch<'a>> = lanes
            .iter()
            .filter_map(|lane| {
                let proj = lane.project(&position)?;
                if proj.distance > self.proximity_radius {
                    return None;
                }
                let dot = direction.dot(&proj.tangent);
                Some(LaneMatch {
                    lane,
                    closest_point: proj.point,
                    distance: proj.distance,
                    station: proj.station,
                    tangent: proj.tangent,
                    alignment: dot.abs().min(1.0),
                    travel_sign: if dot < 0.0 { -1.0 } else { 1.0 },
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.lane.id().cmp(b.lane.id()))
        });
        matches.truncate(self.max_candidates);
        matches.retain(|m| m.alignment >= self.min_alignment);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(lanes: &[(&str, &[(f64, f64)])]) -> LaneMap {
        let mut m = LaneMap::new();
        for (id, raw) in lanes {
            let points = raw.iter().map(|&(x, y)| Point::new(x, y)).collect();
            m.insert(Lane::new(*id, points).unwrap()).unwrap();
        }
        m
    }

    #[test]
    fn test_nearby_aligned_lane() {
        let lanes = map(&[("main", &[(0.0, 52.0), (100.0, 52.0)])]);
        let matcher = LaneMatcher::new(50.0, 4, 0.3);
        let found = matcher.find(&lanes, Point::new(50.0, 50.0), Point::new(1.0, 0.0));
        assert_eq!(found.len(), 1);
        let m = &found[0];
        assert_eq!(m.closest_point, Point::new(50.0, 52.0));
        assert_eq!(m.distance, 2.0);
        assert_eq!(m.alignment, 1.0);
        assert_eq!(m.station, 50.0);
        assert_eq!(m.travel_sign, 1.0);
    }

    #[test]
    fn test_alignment_ignores_polyline_orientation() {
        let lanes = map(&[("reversed", &[(100.0, 52.0), (0.0, 52.0)])]);
        let matcher = LaneMatcher::new(50.0, 4, 0.3);
        let found = matcher.find(&lanes, Point::new(50.0, 50.0), Point::new(1.0, 0.0));
        assert_eq!(found[0].alignment, 1.0);
        assert_eq!(found[0].travel_sign, -1.0);
    }

    #[test]
    fn test_radius_alignment_and_limit() {
        let lanes = map(&[
            ("far", &[(0.0, 200.0), (100.0, 200.0)]),
            ("cross", &[(48.0, 0.0), (48.0, 100.0)]),
            ("a", &[(0.0, 55.0), (100.0, 55.0)]),
            ("b", &[(0.0, 40.0), (100.0, 40.0)]),
            ("c", &[(0.0, 70.0), (100.0, 70.0)]),
            ("d", &[(0.0, 20.0), (100.0, 20.0)]),
        ]);
        let matcher = LaneMatcher::new(50.0, 4, 0.3);
        let found = matcher.find(&lanes, Point::new(50.0, 50.0), Point::new(1.0, 0.0));
        let ids: Vec<&str> = found.iter().map(|m| m.lane.id()).collect();
        // four nearest are cross, a, b, c; the perpendicular one is dropped
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_lane_in_range_is_empty() {
        let lanes = map(&[("far", &[(0.0, 500.0), (10.0, 500.0)])]);
        let matcher = LaneMatcher::new(50.0, 4, 0.3);
        assert!(matcher
            .find(&lanes, Point::new(0.0, 0.0), Point::new(1.0, 0.0))
            .is_empty());
    }
}
