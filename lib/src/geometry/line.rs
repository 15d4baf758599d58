//! Line segment type.

use super::Point;
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line segment defined by two endpoints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

/// A list of line segments.
pub type Lines = Vec<Line>;

impl Line {
    /// Create a new line segment from two points.
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Get the direction vector (b - a).
    #[inline]
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// Length in scaled units.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    /// Calculate the distance from a point to this line segment.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        let proj = p.project_onto_segment(self.a, self.b);
        p.distance(&proj)
    }

    /// Check if a point lies on this segment within `tolerance`.
    pub fn contains_point(&self, p: &Point, tolerance: Coord) -> bool {
        self.distance_to_point(p) <= tolerance as CoordF
    }

    /// Squared distance from `p` to the segment `a`-`b`.
    pub fn distance_to_squared(p: Point, a: Point, b: Point) -> f64 {
        let proj = p.project_onto_segment(a, b);
        p.distance_squared(&proj) as f64
    }

    /// Parameter `t` along this segment where it crosses `other`, if the
    /// segments properly intersect.
    pub fn intersection_param(&self, other: &Line) -> Option<CoordF> {
        let d1 = self.direction();
        let d2 = other.direction();

        let cross = d1.cross(&d2);
        if cross == 0 {
            return None;
        }

        let diff = other.a - self.a;
        let t = diff.cross(&d2) as CoordF / cross as CoordF;
        let u = diff.cross(&d1) as CoordF / cross as CoordF;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    /// True if the segments cross at a point interior to both.
    pub fn crosses(&self, other: &Line) -> bool {
        let d1 = self.direction();
        let d2 = other.direction();
        let cross = d1.cross(&d2);
        if cross == 0 {
            return false;
        }
        let diff = other.a - self.a;
        let t = diff.cross(&d2) as CoordF / cross as CoordF;
        let u = diff.cross(&d1) as CoordF / cross as CoordF;
        t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0
    }

    /// Calculate the intersection point of two line segments.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        self.intersection_param(other).map(|t| self.point_at(t))
    }

    /// Point at parameter `t` (0 = a, 1 = b).
    #[inline]
    pub fn point_at(&self, t: CoordF) -> Point {
        let d = self.direction();
        Point::new(
            (self.a.x as CoordF + t * d.x as CoordF).round() as Coord,
            (self.a.y as CoordF + t * d.y as CoordF).round() as Coord,
        )
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?} -> {:?})", self.a, self.b)
    }
}
