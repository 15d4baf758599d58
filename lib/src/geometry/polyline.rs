//! Polyline type for open paths.

use super::{BoundingBox, Line, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// An open polyline defined by a sequence of points.
///
/// Unlike a Polygon, a Polyline is not implicitly closed - it's a path from
/// the first point to the last point.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
}

/// A list of polylines.
pub type Polylines = Vec<Polyline>;

impl Polyline {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a polyline from a polygon (closes the polygon by repeating the first point).
    pub fn from_polygon(polygon: &Polygon) -> Self {
        let mut points = polygon.points().to_vec();
        if let Some(&first) = points.first() {
            points.push(first);
        }
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    #[inline]
    pub fn first_point(&self) -> Option<Point> {
        self.points.first().copied()
    }

    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Iterate over consecutive segments.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.points.windows(2).map(|w| Line::new(w[0], w[1]))
    }

    /// Calculate the total length of the polyline (scaled units).
    pub fn length(&self) -> CoordF {
        self.lines().map(|l| l.length()).sum()
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Translate the polyline by a vector.
    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    /// Rotate the polyline about the origin.
    pub fn rotate(&mut self, angle: CoordF) {
        for p in &mut self.points {
            *p = p.rotate(angle);
        }
    }
}

impl fmt::Debug for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polyline({} points)", self.points.len())
    }
}

impl Deref for Polyline {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl DerefMut for Polyline {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.points
    }
}
