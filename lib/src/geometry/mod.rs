//! Geometry primitives.
//!
//! - [`Point`] / [`PointF`] - 2D points, scaled integer and millimetre
//! - [`Line`] - Line segment between two points
//! - [`Polygon`] - Closed ring without a repeated closing point
//! - [`Polyline`] - Open path
//! - [`ExPolygon`] - Polygon with holes, plus the [`Containment`] trait
//! - [`BoundingBox`] - Axis-aligned bounding box
//!
//! ## Coordinate System
//!
//! Coordinates are scaled by `SCALING_FACTOR` (1,000,000), so 1 unit = 1 nanometer.
//! Use `scale()` / `unscale()` to convert between mm and internal units.

mod bounding_box;
mod expolygon;
mod line;
mod point;
mod polygon;
mod polyline;
pub mod simplify;

pub use bounding_box::BoundingBox;
pub use expolygon::{Containment, ExPolygon, ExPolygons};
pub use line::{Line, Lines};
pub use point::{Point, PointF, Points};
pub use polygon::{Polygon, Polygons};
pub use polyline::{Polyline, Polylines};
pub use simplify::{douglas_peucker, douglas_peucker_polygon, douglas_peucker_polyline};

use crate::CoordF;

/// Check if a value is approximately equal to another within epsilon.
#[inline]
pub fn approx_eq(a: CoordF, b: CoordF, epsilon: CoordF) -> bool {
    (a - b).abs() < epsilon
}

/// Bounding box of a set of ExPolygons.
pub fn get_extents(expolygons: &[ExPolygon]) -> BoundingBox {
    let mut bb = BoundingBox::default();
    for ex in expolygons {
        bb.merge(&ex.bounding_box());
    }
    bb
}

/// Flatten ExPolygons into their contours and holes.
pub fn to_polygons(expolygons: &[ExPolygon]) -> Polygons {
    expolygons.iter().flat_map(|ex| ex.to_polygons()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_extents() {
        let a = ExPolygon::new(Polygon::square_mm(0.0, 0.0, 5.0));
        let b = ExPolygon::new(Polygon::square_mm(10.0, -2.0, 1.0));
        let bb = get_extents(&[a, b]);
        assert_eq!(bb.min, Point::new_scale(0.0, -2.0));
        assert_eq!(bb.max, Point::new_scale(11.0, 5.0));
        assert!(!get_extents(&[]).defined);
    }

    #[test]
    fn test_to_polygons() {
        let frame = ExPolygon::with_holes(
            Polygon::square_mm(0.0, 0.0, 10.0),
            vec![Polygon::square_mm(2.0, 2.0, 2.0), Polygon::square_mm(6.0, 6.0, 2.0)],
        );
        assert_eq!(to_polygons(&[frame]).len(), 3);
        assert!(approx_eq(0.1 + 0.2, 0.3, 1e-9));
    }
}
