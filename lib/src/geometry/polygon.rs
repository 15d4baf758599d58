//! Closed polygon type.
//!
//! Polygons are stored without a repeated closing point.

use super::{BoundingBox, Line, Point};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A closed polygon ring.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

/// A list of polygons.
pub type Polygons = Vec<Polygon>;

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from points, dropping an explicit closing point.
    pub fn from_points(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            points: vec![
                min,
                Point::new(max.x, min.y),
                max,
                Point::new(min.x, max.y),
            ],
        }
    }

    /// Axis-aligned square of `size` mm with its lower-left corner at (`x`, `y`) mm.
    pub fn square_mm(x: CoordF, y: CoordF, size: CoordF) -> Self {
        Self::rectangle(Point::new_scale(x, y), Point::new_scale(x + size, y + size))
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// At least three vertices.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    /// Edges including the closing edge.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| Line::new(self.points[i], self.points[(i + 1) % n]))
    }

    /// Signed area in scaled² units (positive for counter-clockwise).
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut twice: i128 = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        twice as CoordF / 2.0
    }

    /// Unsigned area in scaled² units.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Returns true if the orientation was changed.
    pub fn make_counter_clockwise(&mut self) -> bool {
        if !self.is_counter_clockwise() {
            self.points.reverse();
            true
        } else {
            false
        }
    }

    /// Returns true if the orientation was changed.
    pub fn make_clockwise(&mut self) -> bool {
        if self.is_counter_clockwise() {
            self.points.reverse();
            true
        } else {
            false
        }
    }

    /// Point-in-polygon test by crossing number. Points on the boundary
    /// count as inside.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        if self.lines().any(|l| l.contains_point(p, 1)) {
            return true;
        }
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let x_cross = pj.x as CoordF
                    + (p.y - pj.y) as CoordF * (pi.x - pj.x) as CoordF / (pi.y - pj.y) as CoordF;
                if (p.x as CoordF) < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// True if any edge of this polygon crosses any edge of `other`.
    pub fn edges_cross(&self, other: &Polygon) -> bool {
        self.lines().any(|a| other.lines().any(|b| a.crosses(&b)))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    pub fn rotate(&mut self, angle: CoordF) {
        for p in &mut self.points {
            *p = p.rotate(angle);
        }
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}
