// src/geometry.rs
//
// Planar point and polyline helpers shared by both pipelines.
// Coordinates are image-plane units (pixels) unless a caller says otherwise.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (*self - *other).norm()
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction, or None for a (near) zero vector.
    pub fn normalized(&self) -> Option<Point> {
        let n = self.norm();
        if n > EPS {
            Some(Point::new(self.x / n, self.y / n))
        } else {
            None
        }
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        *self + (*other - *self) * t
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

// ============================================================================
// SEGMENTS
// ============================================================================

/// Closest point to `p` on segment `ab`, with its parameter t ∈ [0, 1].
pub fn closest_on_segment(p: &Point, a: &Point, b: &Point) -> (Point, f64) {
    let ab = *b - *a;
    let len_sq = ab.dot(&ab);
    if len_sq <= EPS {
        return (*a, 0.0);
    }
    let t = ((*p - *a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a.lerp(b, t), t)
}

pub fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    closest_on_segment(p, a, b).0.distance(p)
}

// ============================================================================
// POLYLINES
// ============================================================================

pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Arc length from the first point to each vertex; same length as `points`.
pub fn cumulative_lengths(points: &[Point]) -> Vec<f64> {
    let mut table = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += points[i - 1].distance(p);
        }
        table.push(total);
    }
    table
}

/// Where a query point lands on a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Point,
    pub distance: f64,
    /// Index of the segment `[segment, segment + 1]` holding `point`
    pub segment: usize,
    /// Arc length from the polyline start to `point`
    pub station: f64,
}

/// Segment-wise closest point. `cumulative` must come from `cumulative_lengths(points)`.
pub fn project_onto_polyline(p: &Point, points: &[Point], cumulative: &[f64]) -> Option<Projection> {
    if points.len() < 2 || cumulative.len() != points.len() {
        return None;
    }

    let mut best: Option<Projection> = None;
    for (i, w) in points.windows(2).enumerate() {
        let (closest, t) = closest_on_segment(p, &w[0], &w[1]);
        let distance = closest.distance(p);
        if best.map_or(true, |b| distance < b.distance) {
            let seg_len = cumulative[i + 1] - cumulative[i];
            best = Some(Projection {
                point: closest,
                distance,
                segment: i,
                station: cumulative[i] + t * seg_len,
            });
        }
    }
    best
}

/// Point at arc length `station`, clamped to the polyline. O(log n).
pub fn point_at_station(points: &[Point], cumulative: &[f64], station: f64) -> Option<Point> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return None,
    };
    let total = *cumulative.last()?;
    if station <= 0.0 {
        return Some(first);
    }
    if station >= total {
        return Some(last);
    }

    // First vertex strictly beyond the station; its predecessor starts the segment.
    let upper = cumulative.partition_point(|&s| s <= station);
    let i = upper.saturating_sub(1).min(points.len() - 2);
    let seg_len = cumulative[i + 1] - cumulative[i];
    if seg_len <= EPS {
        return Some(points[i]);
    }
    let t = (station - cumulative[i]) / seg_len;
    Some(points[i].lerp(&points[i + 1], t))
}

/// Index of the vertex whose station is nearest to `station`. O(log n).
pub fn nearest_vertex(cumulative: &[f64], station: f64) -> Option<usize> {
    if cumulative.is_empty() {
        return None;
    }
    let upper = cumulative.partition_point(|&s| s < station);
    if upper == 0 {
        return Some(0);
    }
    if upper >= cumulative.len() {
        return Some(cumulative.len() - 1);
    }
    let below = station - cumulative[upper - 1];
    let above = cumulative[upper] - station;
    Some(if below <= above { upper - 1 } else { upper })
}

/// `n` points evenly spaced by arc length, endpoints included.
pub fn resample(points: &[Point], n: usize) -> Vec<Point> {
    if points.len() < 2 || n < 2 {
        return points.to_vec();
    }
    let cumulative = cumulative_lengths(points);
    let total = cumulative[cumulative.len() - 1];
    (0..n)
        .filter_map(|k| point_at_station(points, &cumulative, total * k as f64 / (n - 1) as f64))
        .collect()
}

pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Point::default(), |acc, p| acc + *p);
    Some(sum * (1.0 / points.len() as f64))
}

/// Drop consecutive duplicates (zero-length segments carry no tangent).
pub fn dedup_consecutive(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().map_or(true, |last| last.distance(p) > EPS) {
            out.push(*p);
        }
    }
    out
}
