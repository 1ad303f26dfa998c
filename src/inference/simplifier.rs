// src/inference/simplifier.rs

use crate::geometry::{segment_distance, Point};

/// Douglas-Peucker reduction. Every dropped point lies within `tolerance`
/// of the retained segment spanning it; first and last points are kept.
pub struct Simplifier {
    tolerance: f64,
}

impl Simplifier {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn simplify(&self, points: &[Point]) -> Vec<Point> {
        if points.len() <= 2 {
            return points.to_vec();
        }

        let last = points.len() - 1;
        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[last] = true;

        let mut stack = vec![(0, last)];
        while let Some((start, end)) = stack.pop() {
            if end <= start + 1 {
                continue;
            }
            let (a, b) = (points[start], points[end]);
            let (split, deviation) = (start + 1..end)
                .map(|i| (i, segment_distance(&points[i], &a, &b)))
                .fold((start, 0.0_f64), |best, cur| if cur.1 > best.1 { cur } else { best });

            if deviation > self.tolerance {
                keep[split] = true;
                stack.push((start, split));
                stack.push((split, end));
            }
        }

        points
            .iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_deviation(original: &[Point], simplified: &[Point]) -> f64 {
        original
            .iter()
            .map(|p| {
                simplified
                    .windows(2)
                    .map(|w| segment_distance(p, &w[0], &w[1]))
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_near_straight_line_collapses() {
        let original: Vec<Point> = (0..100)
            .map(|i| Point::new(i as f64, 0.3 * (i as f64 * 0.7).sin()))
            .collect();
        let out = Simplifier::new(2.0).simplify(&original);
        assert!((2..=3).contains(&out.len()), "got {} points", out.len());
        assert!(max_deviation(&original, &out) <= 2.0);
        assert_eq!(out[0], original[0]);
        assert_eq!(out[out.len() - 1], original[99]);
    }

    #[test]
    fn test_corner_is_kept() {
        let original = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.1),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(10.1, 10.0),
        ];
        let out = Simplifier::new(0.5).simplify(&original);
        assert_eq!(
            out,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.1, 10.0)]
        );
    }

    #[test]
    fn test_deviation_bound_holds_for_several_tolerances() {
        let original: Vec<Point> = (0..60)
            .map(|i| {
                let t = i as f64 * 0.25;
                Point::new(t * 4.0, 6.0 * t.sin() + 0.5 * (3.0 * t).cos())
            })
            .collect();
        for eps in [0.05, 0.3, 1.0, 4.0] {
            let out = Simplifier::new(eps).simplify(&original);
            assert!(max_deviation(&original, &out) <= eps + 1e-12, "eps {}", eps);
            assert_eq!(out[0], original[0]);
            assert_eq!(out[out.len() - 1], original[59]);
            assert!(out.len() <= original.len());
        }
    }

    #[test]
    fn test_short_inputs_untouched() {
        let two = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(Simplifier::new(1.0).simplify(&two), two);
        assert!(Simplifier::new(1.0).simplify(&[]).is_empty());
    }
}
