//! Polygon with holes.
//!
//! An [`ExPolygon`] is an outer contour (counter-clockwise) with zero or more
//! hole contours (clockwise) fully inside it.

use super::simplify::douglas_peucker_polygon;
use super::{BoundingBox, Point, Polygon, Polygons, Polyline};
use crate::{unscale, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

/// A list of polygons with holes.
pub type ExPolygons = Vec<ExPolygon>;

/// Shapes that can be tested for full containment inside an [`ExPolygon`].
pub trait Containment {
    /// True if `self` lies entirely inside `expolygon` (boundary included).
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool;
}

impl ExPolygon {
    /// Create an ExPolygon without holes, normalizing the contour orientation.
    pub fn new(mut contour: Polygon) -> Self {
        contour.make_counter_clockwise();
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Create an ExPolygon with holes, normalizing all orientations.
    pub fn with_holes(mut contour: Polygon, mut holes: Vec<Polygon>) -> Self {
        contour.make_counter_clockwise();
        for hole in &mut holes {
            hole.make_clockwise();
        }
        Self { contour, holes }
    }

    /// True if the contour has fewer than three vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.contour.is_valid()
    }

    /// Enclosed area (contour minus holes) in scaled² units.
    pub fn area(&self) -> CoordF {
        let holes: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.contour.area() - holes
    }

    /// Enclosed area in mm².
    pub fn area_mm2(&self) -> CoordF {
        self.area() * unscale(1) * unscale(1)
    }

    /// Number of contours: the outer one plus every hole.
    #[inline]
    pub fn num_contours(&self) -> usize {
        1 + self.holes.len()
    }

    /// Contour followed by holes.
    pub fn to_polygons(&self) -> Polygons {
        let mut out = Vec::with_capacity(self.num_contours());
        out.push(self.contour.clone());
        out.extend(self.holes.iter().cloned());
        out
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Test whether `shape` lies entirely inside this region.
    #[inline]
    pub fn contains<T: Containment + ?Sized>(&self, shape: &T) -> bool {
        shape.is_contained_in(self)
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.contour.contains_point(p)
            && !self
                .holes
                .iter()
                .any(|h| h.contains_point(p) && !h.lines().any(|l| l.contains_point(p, 1)))
    }

    fn edges_cross(&self, polygon: &Polygon) -> bool {
        self.contour.edges_cross(polygon) || self.holes.iter().any(|h| h.edges_cross(polygon))
    }

    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for h in &mut self.holes {
            h.translate(v);
        }
    }

    pub fn rotate(&mut self, angle: CoordF) {
        self.contour.rotate(angle);
        for h in &mut self.holes {
            h.rotate(angle);
        }
    }

    /// Douglas-Peucker simplification of every contour (`tolerance` in mm),
    /// followed by a boolean cleanup that may split the result into several
    /// ExPolygons. Degenerate pieces are dropped.
    pub fn simplify(&self, tolerance: CoordF) -> ExPolygons {
        let contour = douglas_peucker_polygon(&self.contour, tolerance);
        if !contour.is_valid() {
            return Vec::new();
        }
        let holes: ExPolygons = self
            .holes
            .iter()
            .map(|h| douglas_peucker_polygon(h, tolerance))
            .filter(|h| h.is_valid())
            .map(ExPolygon::new)
            .collect();

        let outer = [ExPolygon::new(contour)];
        if holes.is_empty() {
            return crate::clipper::union_ex(&outer);
        }
        crate::clipper::difference(&outer, &holes)
    }
}

impl Containment for Point {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        expolygon.contains_point(self)
    }
}

impl Containment for Polyline {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        self.points().iter().all(|p| expolygon.contains_point(p))
            && !self.lines().any(|seg| {
                expolygon.contour.lines().any(|e| seg.crosses(&e))
                    || expolygon.holes.iter().any(|h| h.lines().any(|e| seg.crosses(&e)))
            })
            // a segment can still pass over a hole through two of its vertices
            && self.lines().all(|seg| expolygon.contains_point(&seg.midpoint()))
    }
}

impl Containment for Polygon {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        self.is_valid()
            && self.points().iter().all(|p| expolygon.contains_point(p))
            && !expolygon.edges_cross(self)
            && self.lines().all(|seg| expolygon.contains_point(&seg.midpoint()))
            && !expolygon
                .holes
                .iter()
                .any(|h| h.points().iter().any(|p| self.contains_point(p) && !on_boundary(self, p)))
    }
}

impl Containment for ExPolygon {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        self.contour.is_contained_in(expolygon)
    }
}

fn on_boundary(polygon: &Polygon, p: &Point) -> bool {
    polygon.lines().any(|l| l.contains_point(p, 1))
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon(contour: {} points, holes: {})",
            self.contour.len(),
            self.holes.len()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        ExPolygon::new(contour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygon {
        ExPolygon::new(Polygon::square_mm(x, y, size))
    }

    fn make_frame() -> ExPolygon {
        ExPolygon::with_holes(
            Polygon::square_mm(0.0, 0.0, 20.0),
            vec![Polygon::square_mm(5.0, 5.0, 10.0)],
        )
    }

    #[test]
    fn test_orientation_normalized() {
        let frame = make_frame();
        assert!(frame.contour.is_counter_clockwise());
        assert!(!frame.holes[0].is_counter_clockwise());
        assert_eq!(frame.num_contours(), 2);
        assert!((frame.area_mm2() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_contains_point_respects_holes() {
        let frame = make_frame();
        assert!(frame.contains(&Point::new_scale(2.0, 2.0)));
        assert!(!frame.contains(&Point::new_scale(10.0, 10.0)));
        assert!(frame.contains(&Point::new_scale(5.0, 10.0)));
    }

    #[test]
    fn test_contains_polygon() {
        let frame = make_frame();
        assert!(frame.contains(&Polygon::square_mm(1.0, 1.0, 3.0)));
        // overlaps the hole
        assert!(!frame.contains(&Polygon::square_mm(1.0, 1.0, 6.0)));
        // surrounds the hole entirely
        assert!(!frame.contains(&Polygon::square_mm(2.0, 2.0, 16.0)));
        assert!(make_square_mm(0.0, 0.0, 10.0).contains(&make_square_mm(2.0, 2.0, 5.0)));
    }

    #[test]
    fn test_contains_polyline() {
        let frame = make_frame();
        let inside = Polyline::from_points(vec![
            Point::new_scale(1.0, 1.0),
            Point::new_scale(19.0, 1.0),
        ]);
        let across_hole = Polyline::from_points(vec![
            Point::new_scale(1.0, 10.0),
            Point::new_scale(19.0, 10.0),
        ]);
        assert!(frame.contains(&inside));
        assert!(!frame.contains(&across_hole));
    }

    #[test]
    fn test_simplify_drops_collinear_points() {
        let mut pts = Vec::new();
        for i in 0..=10 {
            pts.push(Point::new_scale(i as f64, 0.0));
        }
        pts.push(Point::new_scale(10.0, 10.0));
        pts.push(Point::new_scale(0.0, 10.0));
        let ex = ExPolygon::new(Polygon::from_points(pts));
        let simplified = ex.simplify(0.01);
        assert_eq!(simplified.len(), 1);
        assert!(simplified[0].contour.len() <= 5);
        let diff = (simplified[0].area() - ex.area()).abs();
        assert!(diff < (scale(0.1) as f64).powi(2));
    }
}
