//! Axis-aligned bounding boxes.

use super::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// 2D axis-aligned bounding box in scaled coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
    /// False until at least one point has been merged.
    pub defined: bool,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self {
            min,
            max,
            defined: true,
        }
    }

    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self::default();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    pub fn merge_point(&mut self, p: Point) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn size(&self) -> Point {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.defined
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.defined
            && other.defined
            && self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Grow the box by `delta` on every side.
    pub fn offset(&mut self, delta: Coord) {
        if self.defined {
            self.min = self.min - Point::new(delta, delta);
            self.max = self.max + Point::new(delta, delta);
        }
    }

    /// Snap `min` down onto a grid of `step` anchored at the origin.
    pub fn align_to_grid(&mut self, step: Coord) {
        if self.defined && step > 0 {
            self.min.x = self.min.x.div_euclid(step) * step;
            self.min.y = self.min.y.div_euclid(step) * step;
        }
    }

}
