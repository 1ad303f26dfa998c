// src/inference/track_merger.rs
//
// Hausdorff clustering of smoothed trajectories into lane candidates.
//
// Every pair within the threshold is unioned, so membership is transitive:
// A and C share a lane whenever some B is close to both, even when A and C
// themselves are further apart than the threshold.

use super::smoother::PolylineSmoother;
use crate::disjoint_set::DisjointSet;
use crate::geometry::{
    cumulative_lengths, nearest_vertex, polyline_length, project_onto_polyline, Point,
};
use tracing::{debug, info};

/// A merged polyline plus the tracks that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneCandidate {
    pub polyline: Vec<Point>,
    /// Ascending
    pub track_ids: Vec<u64>,
}

impl LaneCandidate {
    pub fn from_track(track_id: u64, polyline: Vec<Point>) -> Self {
        Self {
            polyline,
            track_ids: vec![track_id],
        }
    }

    fn first_track(&self) -> u64 {
        self.track_ids.first().copied().unwrap_or(u64::MAX)
    }
}

// ============================================================================
// HAUSDORFF DISTANCE
// ============================================================================

/// h(A, B) = max over a ∈ A of the distance from a to its nearest b ∈ B.
///
/// Infinite when either set is empty.
pub fn directed_hausdorff(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    let mut worst = 0.0_f64;
    for p in a {
        let mut nearest = f64::INFINITY;
        for q in b {
            let d = p.distance(q);
            if d < nearest {
                nearest = d;
                // p cannot raise the maximum any more
                if nearest <= worst {
                    break;
                }
            }
        }
        worst = worst.max(nearest);
    }
    worst
}

/// H(A, B) = max(h(A, B), h(B, A)); commutative.
pub fn hausdorff_distance(a: &[Point], b: &[Point]) -> f64 {
    directed_hausdorff(a, b).max(directed_hausdorff(b, a))
}

// ============================================================================
// MERGER
// ============================================================================

pub struct TrackMerger {
    threshold: f64,
    smoother: PolylineSmoother,
}

impl TrackMerger {
    pub fn new(threshold: f64, smoother: PolylineSmoother) -> Self {
        Self {
            threshold,
            smoother,
        }
    }

    /// Cluster candidates whose symmetric Hausdorff distance is within the
    /// threshold. Output is ordered by each component's smallest track id.
    pub fn merge(&self, mut candidates: Vec<LaneCandidate>) -> Vec<LaneCandidate> {
        candidates.sort_by_key(|c| c.first_track());
        let n = candidates.len();
        let mut sets = DisjointSet::new(n);

        for i in 0..n {
            for j in (i + 1)..n {
                let h = hausdorff_distance(&candidates[i].polyline, &candidates[j].polyline);
                if h <= self.threshold && sets.union(i, j) {
                    debug!(
                        "Merging tracks {:?} and {:?} (H = {:.2})",
                        candidates[i].track_ids, candidates[j].track_ids, h
                    );
                }
            }
        }

        let groups = sets.groups();
        let merged: Vec<LaneCandidate> = groups
            .iter()
            .map(|members| {
                let group: Vec<&LaneCandidate> = members.iter().map(|&i| &candidates[i]).collect();
                self.consolidate(&group)
            })
            .collect();

        info!(
            "🔗 Merged {} trajectories into {} lane candidates",
            n,
            merged.len()
        );
        merged
    }

    fn consolidate(&self, group: &[&LaneCandidate]) -> LaneCandidate {
        let mut track_ids: Vec<u64> = group.iter().flat_map(|c| c.track_ids.iter().copied()).collect();
        track_ids.sort_unstable();
        track_ids.dedup();

        if let [single] = group {
            return LaneCandidate {
                polyline: single.polyline.clone(),
                track_ids,
            };
        }

        let binned = representative(group);
        let mut polyline = self.smoother.smooth(&binned);
        // keep the binned extent; the clipped window pulls both ends inward
        if let (Some(first), Some(last)) = (binned.first(), binned.last()) {
            if let Some(p) = polyline.first_mut() {
                *p = *first;
            }
            if let Some(p) = polyline.last_mut() {
                *p = *last;
            }
        }

        LaneCandidate {
            polyline,
            track_ids,
        }
    }
}

/// Bin every member point onto the vertices of the longest member and
/// average each bin. Empty bins are dropped; order follows the reference.
fn representative(group: &[&LaneCandidate]) -> Vec<Point> {
    let reference = group
        .iter()
        .copied()
        .max_by(|a, b| {
            polyline_length(&a.polyline)
                .total_cmp(&polyline_length(&b.polyline))
                .then_with(|| b.first_track().cmp(&a.first_track()))
        })
        .map(|c| c.polyline.as_slice())
        .unwrap_or(&[]);

    let cumulative = cumulative_lengths(reference);
    let mut bins: Vec<(Point, usize)> = vec![(Point::default(), 0); reference.len()];

    for p in group.iter().flat_map(|c| c.polyline.iter()) {
        let vertex = project_onto_polyline(p, reference, &cumulative)
            .and_then(|proj| nearest_vertex(&cumulative, proj.station))
            .unwrap_or(0);
        if let Some(bin) = bins.get_mut(vertex) {
            bin.0 = bin.0 + *p;
            bin.1 += 1;
        }
    }

    bins.into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(sum, count)| sum * (1.0 / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: u64, raw: &[(f64, f64)]) -> LaneCandidate {
        LaneCandidate::from_track(id, raw.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn merger(threshold: f64) -> TrackMerger {
        TrackMerger::new(threshold, PolylineSmoother::new(5))
    }

    #[test]
    fn test_hausdorff_is_commutative() {
        let a = line(1, &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]).polyline;
        let b = line(2, &[(0.0, 1.0), (10.0, 4.0), (35.0, 1.0), (40.0, -2.0)]).polyline;
        assert_eq!(hausdorff_distance(&a, &b), hausdorff_distance(&b, &a));
        // the far end of b dominates
        assert!((hausdorff_distance(&a, &b) - (20.0_f64.powi(2) + 4.0).sqrt()).abs() < 1e-9);
        assert!(directed_hausdorff(&a, &b) < directed_hausdorff(&b, &a));
    }

    #[test]
    fn test_hausdorff_empty_set_is_infinite() {
        let a = vec![Point::new(0.0, 0.0)];
        assert!(hausdorff_distance(&a, &[]).is_infinite());
    }

    #[test]
    fn test_parallel_tracks_merge_to_midline() {
        let a = line(1, &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let b = line(2, &[(0.0, 1.0), (10.0, 1.0), (20.0, 1.0)]);
        assert_eq!(hausdorff_distance(&a.polyline, &b.polyline), 1.0);

        let out = merger(2.0).merge(vec![b, a]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_ids, vec![1, 2]);
        let expected = [Point::new(0.0, 0.5), Point::new(10.0, 0.5), Point::new(20.0, 0.5)];
        assert_eq!(out[0].polyline.len(), 3);
        for (p, e) in out[0].polyline.iter().zip(expected.iter()) {
            assert!(p.distance(e) < 1e-9, "{:?} vs {:?}", p, e);
        }
    }

    #[test]
    fn test_merging_is_transitive_through_chains() {
        let a = line(1, &[(0.0, 0.0), (50.0, 0.0)]);
        let b = line(2, &[(0.0, 3.0), (50.0, 3.0)]);
        let c = line(3, &[(0.0, 6.0), (50.0, 6.0)]);
        assert!(hausdorff_distance(&a.polyline, &c.polyline) > 4.0);

        let out = merger(4.0).merge(vec![a, c, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_distant_tracks_stay_apart_in_id_order() {
        let out = merger(2.0).merge(vec![
            line(7, &[(0.0, 50.0), (20.0, 50.0)]),
            line(3, &[(0.0, 0.0), (20.0, 0.0)]),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].track_ids, vec![3]);
        assert_eq!(out[1].track_ids, vec![7]);
        // lone tracks keep their geometry
        assert_eq!(out[0].polyline, vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0)]);
    }

    #[test]
    fn test_remerge_is_idempotent() {
        let m = merger(2.0);
        let first = m.merge(vec![
            line(1, &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]),
            line(2, &[(0.0, 1.0), (10.0, 1.0), (20.0, 1.0)]),
            line(3, &[(0.0, 40.0), (10.0, 40.0), (20.0, 40.0)]),
            line(4, &[(0.0, 80.0), (20.0, 80.0)]),
        ]);
        let second = m.merge(first.clone());
        assert_eq!(first, second);
    }

    fn spaced(id: u64, y: f64, from: u32, to: u32) -> LaneCandidate {
        LaneCandidate::from_track(
            id,
            (from..=to).map(|k| Point::new(k as f64 * 10.0, y)).collect(),
        )
    }

    #[test]
    fn test_remerge_keeps_extent_of_smoothed_lane() {
        let m = merger(6.0);
        // 11-point members long enough for the window to act, plus a
        // shorter parallel track 10 units inside them at both ends
        let first = m.merge(vec![
            spaced(1, 0.0, 0, 10),
            spaced(2, 1.0, 0, 10),
            spaced(3, 0.5, 1, 9),
        ]);
        let groups: Vec<Vec<u64>> = first.iter().map(|c| c.track_ids.clone()).collect();
        assert_eq!(groups, vec![vec![1, 2], vec![3]]);

        let merged = &first[0].polyline;
        assert_eq!(merged.len(), 11);
        assert!(merged[0].distance(&Point::new(0.0, 0.5)) < 1e-9);
        assert!(merged[10].distance(&Point::new(100.0, 0.5)) < 1e-9);
        // interior points are still smoothed
        assert!((merged[1].x - 15.0).abs() < 1e-9);

        let second = m.merge(first.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_representative_follows_longest_member() {
        let short = line(1, &[(0.0, 2.0), (10.0, 2.0)]);
        let long = line(2, &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let group = [&short, &long];
        let rep = representative(&group);
        assert_eq!(rep.len(), 4);
        assert!(rep[0].distance(&Point::new(0.0, 1.0)) < 1e-9);
        assert!(rep[3].distance(&Point::new(30.0, 0.0)) < 1e-9);
    }
}
