// src/inference/endpoint_snapper.rs

use super::track_merger::LaneCandidate;
use crate::disjoint_set::DisjointSet;
use crate::geometry::{centroid, Point};
use std::collections::BTreeSet;
use tracing::debug;

/// Pulls nearly coincident endpoints of different candidates onto one shared
/// coordinate. Only endpoints move; candidates are never joined.
pub struct EndpointSnapper {
    tolerance: f64,
}

impl EndpointSnapper {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Returns how many endpoints were moved.
    pub fn snap(&self, candidates: &mut [LaneCandidate]) -> usize {
        // (candidate index, vertex index)
        let endpoints: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.polyline.len() >= 2)
            .flat_map(|(i, c)| [(i, 0), (i, c.polyline.len() - 1)])
            .collect();
        let position = |&(c, v): &(usize, usize)| candidates[c].polyline[v];

        let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
        for a in 0..endpoints.len() {
            for b in (a + 1)..endpoints.len() {
                if endpoints[a].0 == endpoints[b].0 {
                    continue;
                }
                let d = position(&endpoints[a]).distance(&position(&endpoints[b]));
                if d <= self.tolerance {
                    pairs.push((d, a, b));
                }
            }
        }
        pairs.sort_by(|x, y| x.0.total_cmp(&y.0).then_with(|| (x.1, x.2).cmp(&(y.1, y.2))));

        // Closest pairs first. A group never holds both ends of one
        // candidate, so no candidate collapses to a point.
        let mut sets = DisjointSet::new(endpoints.len());
        let mut owners: Vec<BTreeSet<usize>> =
            endpoints.iter().map(|&(c, _)| BTreeSet::from([c])).collect();
        for (_, a, b) in pairs {
            let (ra, rb) = (sets.find(a), sets.find(b));
            if ra == rb || !owners[ra].is_disjoint(&owners[rb]) {
                continue;
            }
            let joined: BTreeSet<usize> = owners[ra].union(&owners[rb]).copied().collect();
            sets.union(a, b);
            let root = sets.find(a);
            owners[root] = joined;
        }

        let targets: Vec<(Vec<usize>, Point)> = sets
            .groups()
            .into_iter()
            .filter(|members| members.len() > 1)
            .filter_map(|members| {
                let points: Vec<Point> = members.iter().map(|&m| position(&endpoints[m])).collect();
                centroid(&points).map(|c| (members, c))
            })
            .collect();

        let mut moved = 0;
        for (members, shared) in targets {
            for m in members {
                let (c, v) = endpoints[m];
                candidates[c].polyline[v] = shared;
                moved += 1;
            }
            debug!("Snapped endpoint group to ({:.2}, {:.2})", shared.x, shared.y);
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: u64, raw: &[(f64, f64)]) -> LaneCandidate {
        LaneCandidate::from_track(id, raw.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn test_snapped_pair_meets_at_midpoint() {
        let mut cs = vec![
            cand(1, &[(0.0, 0.0), (10.0, 0.0)]),
            cand(2, &[(12.0, 2.0), (30.0, 0.0)]),
        ];
        let moved = EndpointSnapper::new(5.0).snap(&mut cs);
        assert_eq!(moved, 2);
        assert_eq!(cs[0].polyline[1], Point::new(11.0, 1.0));
        assert_eq!(cs[0].polyline[1].distance(&cs[1].polyline[0]), 0.0);
        // untouched ends
        assert_eq!(cs[0].polyline[0], Point::new(0.0, 0.0));
        assert_eq!(cs[1].polyline[1], Point::new(30.0, 0.0));
        // features are not joined
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[1].polyline.len(), 2);
    }

    #[test]
    fn test_own_endpoints_never_pair() {
        let mut cs = vec![cand(1, &[(0.0, 0.0), (3.0, 0.0)])];
        assert_eq!(EndpointSnapper::new(5.0).snap(&mut cs), 0);
        assert_eq!(cs[0].polyline[1], Point::new(3.0, 0.0));
    }

    #[test]
    fn test_three_way_junction_shares_one_point() {
        let mut cs = vec![
            cand(1, &[(-20.0, 0.0), (0.0, 0.0)]),
            cand(2, &[(3.0, 0.0), (20.0, 0.0)]),
            cand(3, &[(0.0, 3.0), (0.0, 20.0)]),
        ];
        let moved = EndpointSnapper::new(5.0).snap(&mut cs);
        assert_eq!(moved, 3);
        let shared = cs[0].polyline[1];
        assert_eq!(shared, Point::new(1.0, 1.0));
        assert_eq!(cs[1].polyline[0], shared);
        assert_eq!(cs[2].polyline[0], shared);
    }

    #[test]
    fn test_short_candidate_keeps_both_ends() {
        // B's start is within tolerance of both ends of A
        let mut cs = vec![
            cand(1, &[(0.0, 0.0), (10.0, 0.0)]),
            cand(2, &[(5.0, 3.0), (40.0, 3.0)]),
        ];
        let moved = EndpointSnapper::new(15.0).snap(&mut cs);
        assert_eq!(moved, 2);
        // ties break on endpoint order, so A's start wins
        assert_eq!(cs[0].polyline[0], Point::new(2.5, 1.5));
        assert_eq!(cs[1].polyline[0], Point::new(2.5, 1.5));
        assert_eq!(cs[0].polyline[1], Point::new(10.0, 0.0));
        assert!(cs[0].polyline[0].distance(&cs[0].polyline[1]) > 0.0);
    }

    #[test]
    fn test_far_endpoints_untouched() {
        let mut cs = vec![
            cand(1, &[(0.0, 0.0), (10.0, 0.0)]),
            cand(2, &[(40.0, 0.0), (60.0, 0.0)]),
        ];
        assert_eq!(EndpointSnapper::new(15.0).snap(&mut cs), 0);
    }
}
