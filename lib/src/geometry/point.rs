//! 2D point types.
//!
//! [`Point`] stores scaled integer coordinates, [`PointF`] stores millimetres.

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

/// A list of points.
pub type Points = Vec<Point>;

impl Point {
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from millimetre coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Convert to an unscaled floating-point point (mm).
    #[inline]
    pub fn to_f64(&self) -> PointF {
        PointF::new(unscale(self.x), unscale(self.y))
    }

    /// Squared euclidean distance, widened to avoid overflow.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    /// Euclidean distance in scaled units.
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    #[inline]
    pub fn length_squared(&self) -> i128 {
        self.x as i128 * self.x as i128 + self.y as i128 * self.y as i128
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        (self.length_squared() as CoordF).sqrt()
    }

    #[inline]
    pub fn dot(&self, other: &Point) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    #[inline]
    pub fn cross(&self, other: &Point) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    /// True if both coordinates are within `tolerance` of `other`.
    #[inline]
    pub fn coincides_with(&self, other: &Point, tolerance: Coord) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Project this point onto the segment `a`-`b`, clamping to its ends.
    pub fn project_onto_segment(&self, a: Point, b: Point) -> Point {
        let ab = b - a;
        let len_sq = ab.length_squared();
        if len_sq == 0 {
            return a;
        }
        let t = ((*self - a).dot(&ab) as CoordF / len_sq as CoordF).clamp(0.0, 1.0);
        Point::new(
            (a.x as CoordF + t * ab.x as CoordF).round() as Coord,
            (a.y as CoordF + t * ab.y as CoordF).round() as Coord,
        )
    }

    /// Rotate about the origin by `angle` radians.
    pub fn rotate(&self, angle: CoordF) -> Point {
        let (s, c) = angle.sin_cos();
        let x = self.x as CoordF;
        let y = self.y as CoordF;
        Point::new((c * x - s * y).round() as Coord, (s * x + c * y).round() as Coord)
    }

}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<CoordF> for Point {
    type Output = Point;

    #[inline]
    fn mul(self, rhs: CoordF) -> Point {
        Point::new(
            (self.x as CoordF * rhs).round() as Coord,
            (self.y as CoordF * rhs).round() as Coord,
        )
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", unscale(self.x), unscale(self.y))
    }
}

/// A 2D point in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.x.hypot(self.y)
    }

    /// Scale back into integer coordinates.
    #[inline]
    pub fn to_scaled(&self) -> Point {
        Point::new_scale(self.x, self.y)
    }
}

impl Sub for PointF {
    type Output = PointF;

    #[inline]
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}
