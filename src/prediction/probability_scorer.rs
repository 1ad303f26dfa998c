// src/prediction/probability_scorer.rs
//
// score = w_align·alignment
//       + w_prox·exp(−distance / scale)
//       + w_cons·consistency
//       + w_center·[distance ≤ near_centerline]
// clamped to [0, 1].

use super::lane_matcher::LaneMatch;
use crate::types::{PredictionConfig, ScoringWeights};

#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub lane_match: LaneMatch<'a>,
    pub probability: f64,
}

pub struct ProbabilityScorer {
    weights: ScoringWeights,
    proximity_scale: f64,
    near_centerline: f64,
    min_probability: f64,
    max_paths: usize,
}

impl ProbabilityScorer {
    pub fn from_config(config: &PredictionConfig) -> Self {
        Self {
            weights: config.weights,
            proximity_scale: config.proximity_scale,
            near_centerline: config.near_centerline_threshold,
            min_probability: config.min_probability,
            max_paths: config.max_paths,
        }
    }

    pub fn score(&self, lane_match: &LaneMatch<'_>, consistency: f64) -> f64 {
        let w = &self.weights;
        let proximity = (-lane_match.distance / self.proximity_scale).exp();
        let centerline = if lane_match.distance <= self.near_centerline { 1.0 } else { 0.0 };
        let raw = w.alignment * lane_match.alignment
            + w.proximity * proximity
            + w.consistency * consistency.clamp(0.0, 1.0)
            + w.centerline * centerline;
        if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Best first, at most `max_paths`, each at least `min_probability`.
    pub fn rank<'a>(&self, matches: Vec<LaneMatch<'a>>, consistency: f64) -> Vec<ScoredCandidate<'a>> {
        let mut scored: Vec<ScoredCandidate<'a>> = matches
            .into_iter()
            .map(|lane_match| ScoredCandidate {
                probability: self.score(&lane_match, consistency),
                lane_match,
            })
            .filter(|c| c.probability >= self.min_probability)
            .collect();

        scored.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.lane_match.lane.id().cmp(b.lane_match.lane.id()))
        });
        scored.truncate(self.max_paths);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::lane_map::Lane;

    fn lane(id: &str, y: f64) -> Lane {
        Lane::new(id, vec![Point::new(0.0, y), Point::new(100.0, y)]).unwrap()
    }

    fn matched(lane: &Lane, distance: f64, alignment: f64) -> LaneMatch<'_> {
        LaneMatch {
            lane,
            closest_point: Point::new(50.0, 50.0 + distance),
            distance,
            station: 50.0,
            tangent: Point::new(1.0, 0.0),
            alignment,
            travel_sign: 1.0,
        }
    }

    #[test]
    fn test_close_aligned_lane_scores_high() {
        let scorer = ProbabilityScorer::from_config(&PredictionConfig::default());
        let l = lane("main", 52.0);
        let p = scorer.score(&matched(&l, 2.0, 1.0), 1.0);
        let expected = 0.4 + 0.3 * (-0.1_f64).exp() + 0.15 + 0.15;
        assert!((p - expected).abs() < 1e-12);
        assert!(p > 0.9);

        // the same lane just outside the centerline band loses the boost
        let far = scorer.score(&matched(&l, 16.0, 1.0), 1.0);
        assert!(p - far > 0.15);
    }

    #[test]
    fn test_rank_sorted_bounded_and_clamped() {
        let mut config = PredictionConfig::default();
        config.weights.alignment = 2.0;
        let scorer = ProbabilityScorer::from_config(&config);
        let lanes: Vec<Lane> = (0..6).map(|i| lane(&format!("l{}", i), i as f64)).collect();
        let matches: Vec<LaneMatch> = lanes
            .iter()
            .enumerate()
            .map(|(i, l)| matched(l, 4.0 * i as f64, 1.0 - 0.1 * i as f64))
            .collect();

        let ranked = scorer.rank(matches, 0.8);
        assert!(ranked.len() <= config.max_paths);
        assert!(ranked.iter().all(|c| (0.0..=1.0).contains(&c.probability)));
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
        // every score clamps at 1.0, so lane id decides
        let ids: Vec<&str> = ranked.iter().map(|c| c.lane_match.lane.id()).collect();
        assert_eq!(ids, vec!["l0", "l1", "l2"]);
    }

    #[test]
    fn test_weak_candidates_dropped() {
        let scorer = ProbabilityScorer::from_config(&PredictionConfig::default());
        let l = lane("weak", 0.0);
        // 0.4·0.3 + 0.3·e^-2.5 ≈ 0.145
        assert!(scorer.rank(vec![matched(&l, 50.0, 0.3)], 0.0).is_empty());
    }
}
