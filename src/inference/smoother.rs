// src/inference/smoother.rs

use crate::geometry::Point;

/// Centered moving average over a point sequence.
pub struct PolylineSmoother {
    window_size: usize,
}

impl PolylineSmoother {
    /// Create a new smoother with specified window size
    ///
    /// # Arguments
    /// * `window_size` - Number of points averaged around each index (e.g., 5)
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth a sequence, preserving its length and order
    ///
    /// Point i becomes the mean of points [i − W/2, i + W/2], clipped at
    /// both ends. Sequences shorter than the window are returned as is.
    pub fn smooth(&self, points: &[Point]) -> Vec<Point> {
        if points.len() < self.window_size {
            return points.to_vec();
        }

        let half = self.window_size / 2;
        let n = points.len();
        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(n);
                let window = &points[start..end];
                let sum = window.iter().fold(Point::default(), |acc, p| acc + *p);
                sum * (1.0 / window.len() as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs(points: &[Point]) -> Vec<f64> {
        points.iter().map(|p| p.x).collect()
    }

    #[test]
    fn test_smoother_preserves_length_and_clips_edges() {
        let smoother = PolylineSmoother::new(3);
        let input: Vec<Point> = [0.0, 3.0, 6.0, 30.0]
            .iter()
            .map(|&x| Point::new(x, 1.0))
            .collect();
        let out = smoother.smooth(&input);

        assert_eq!(out.len(), 4);
        // index 0 averages [0, 1], index 3 averages [2, 3]
        assert_eq!(xs(&out), vec![1.5, 3.0, 13.0, 18.0]);
        assert!(out.iter().all(|p| p.y == 1.0));
    }

    #[test]
    fn test_smoother_damps_outlier() {
        let smoother = PolylineSmoother::new(5);
        let mut input: Vec<Point> = (0..9).map(|i| Point::new(i as f64, 0.0)).collect();
        input[4].y = 10.0;
        let out = smoother.smooth(&input);
        assert!((out[4].y - 2.0).abs() < 1e-12);
        assert!((out[4].x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_sequence_untouched() {
        let smoother = PolylineSmoother::new(5);
        let input = vec![Point::new(0.0, 0.0), Point::new(10.0, 4.0), Point::new(20.0, 0.0)];
        assert_eq!(smoother.smooth(&input), input);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let smoother = PolylineSmoother::new(1);
        let input = vec![Point::new(0.0, 0.0), Point::new(7.0, 4.0)];
        assert_eq!(smoother.smooth(&input), input);
    }
}
