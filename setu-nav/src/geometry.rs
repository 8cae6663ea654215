//! Board coordinates, rectangles and segment tests

use serde::Deserialize;
use std::fmt;

/// Tolerance for on-segment and on-boundary tests (cm)
const EPSILON: f64 = 1e-6;

/// An (x, y) board position in centimetres, compared by exact value
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale a coordinate given in tiles into centimetres
    pub fn scaled(self, tile: f64) -> Self {
        Self::new(self.x * tile, self.y * tile)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn manhattan(&self, other: &Coordinate) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn distance(&self, other: &Coordinate) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Same row or same column
    #[inline]
    pub fn is_aligned_with(&self, other: &Coordinate) -> bool {
        self.x == other.x || self.y == other.y
    }

    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Axis-aligned rectangle given by lower-left and upper-right corners
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub ll: Coordinate,
    pub ur: Coordinate,
}

impl Rect {
    pub fn new(ll: Coordinate, ur: Coordinate) -> Self {
        Self { ll, ur }
    }

    pub fn scaled(self, tile: f64) -> Self {
        Self::new(self.ll.scaled(tile), self.ur.scaled(tile))
    }

    pub fn width(&self) -> f64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> f64 {
        self.ur.y - self.ll.y
    }

    pub fn center(&self) -> Coordinate {
        self.ll.midpoint(&self.ur)
    }

    /// Shrink by `margin` on every side (negative grows)
    pub fn shrunk(&self, margin: f64) -> Rect {
        Rect::new(self.ll.offset(margin, margin), self.ur.offset(-margin, -margin))
    }

    /// Strictly inside, boundary excluded
    pub fn contains_strict(&self, p: &Coordinate) -> bool {
        p.x > self.ll.x && p.x < self.ur.x && p.y > self.ll.y && p.y < self.ur.y
    }

    /// Inside or on the boundary
    pub fn contains_closed(&self, p: &Coordinate) -> bool {
        p.x >= self.ll.x && p.x <= self.ur.x && p.y >= self.ll.y && p.y <= self.ur.y
    }

    /// On the boundary but not inside
    pub fn on_boundary(&self, p: &Coordinate) -> bool {
        self.contains_closed(p) && !self.contains_strict(p)
    }

    pub fn is_corner(&self, p: &Coordinate) -> bool {
        (p.x == self.ll.x || p.x == self.ur.x) && (p.y == self.ll.y || p.y == self.ur.y)
    }
}

fn cross(o: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn within_bounds(a: &Coordinate, b: &Coordinate, p: &Coordinate) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

/// Whether `p` lies on the closed segment `a`–`b`
pub fn segment_contains(a: &Coordinate, b: &Coordinate, p: &Coordinate) -> bool {
    let scale = a.distance(b).max(1.0);
    cross(a, b, p).abs() <= EPSILON * scale && within_bounds(a, b, p)
}

/// Whether the closed segments `a`–`b` and `c`–`d` share at least one point
pub fn segments_intersect(a: &Coordinate, b: &Coordinate, c: &Coordinate, d: &Coordinate) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    segment_contains(c, d, a)
        || segment_contains(c, d, b)
        || segment_contains(a, b, c)
        || segment_contains(a, b, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn test_rect_membership() {
        let r = Rect::new(c(0.0, 0.0), c(60.0, 30.0));
        assert!(r.contains_strict(&c(30.0, 15.0)));
        assert!(!r.contains_strict(&c(0.0, 15.0)));
        assert!(r.on_boundary(&c(0.0, 15.0)));
        assert!(r.is_corner(&c(60.0, 0.0)));
        assert!(!r.contains_closed(&c(61.0, 15.0)));
    }

    #[test]
    fn test_segment_contains() {
        assert!(segment_contains(&c(0.0, 0.0), &c(0.0, 90.0), &c(0.0, 30.0)));
        assert!(segment_contains(&c(0.0, 0.0), &c(0.0, 90.0), &c(0.0, 90.0)));
        assert!(!segment_contains(&c(0.0, 0.0), &c(0.0, 90.0), &c(0.0, 120.0)));
        assert!(!segment_contains(&c(0.0, 0.0), &c(0.0, 90.0), &c(1.0, 30.0)));
    }

    #[test]
    fn test_segments_intersect() {
        // Crossing
        assert!(segments_intersect(&c(0.0, 0.0), &c(10.0, 10.0), &c(0.0, 10.0), &c(10.0, 0.0)));
        // Touching at an endpoint
        assert!(segments_intersect(&c(0.0, 0.0), &c(5.0, 0.0), &c(5.0, -5.0), &c(5.0, 5.0)));
        // Parallel
        assert!(!segments_intersect(&c(0.0, 0.0), &c(10.0, 0.0), &c(0.0, 1.0), &c(10.0, 1.0)));
        // Disjoint colinear
        assert!(!segments_intersect(&c(0.0, 0.0), &c(1.0, 0.0), &c(2.0, 0.0), &c(3.0, 0.0)));
    }

    #[test]
    fn test_coordinate_deserializes_from_pair() {
        #[derive(Deserialize)]
        struct Holder {
            at: Coordinate,
        }
        let holder: Holder = toml::from_str("at = [1.5, 2.0]").unwrap();
        assert_eq!(holder.at, c(1.5, 2.0));
    }
}
