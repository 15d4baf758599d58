//! Clipper polygon boolean operations module.
//!
//! This module provides polygon boolean operations (union, intersection, difference)
//! and offset operations using the geo-clipper library, plus clipping of open
//! polylines against regions.
//!
//! Offsets take distances in mm. Results are normalized ExPolygons (CCW
//! contours, CW holes).

use crate::geometry::{ExPolygon, ExPolygons, Line, Point, Polygon, Polyline};
use crate::{unscale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Integer precision clipper works at: coordinates in mm times this factor.
const CLIPPER_FACTOR: f64 = 1000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(3.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    LineString::new(ring)
}

fn geo_to_ring(ring: &LineString<f64>) -> Polygon {
    // from_points drops the closing coordinate
    Polygon::from_points(
        ring.coords()
            .map(|c| Point::new(crate::scale(c.x), crate::scale(c.y)))
            .collect(),
    )
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&expoly.contour),
        expoly.holes.iter().map(ring_to_geo).collect(),
    )
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    ExPolygon::with_holes(
        geo_to_ring(geo_poly.exterior()),
        geo_poly
            .interiors()
            .iter()
            .map(geo_to_ring)
            .filter(Polygon::is_valid)
            .collect(),
    )
}

fn to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        expolys
            .iter()
            .filter(|ex| !ex.is_empty())
            .map(expolygon_to_geo)
            .collect(),
    )
}

fn from_geo_multi(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(geo_to_expolygon)
        .filter(|ex| !ex.is_empty() && ex.area() > 0.0)
        .collect()
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Compute the union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }

    let result = to_geo_multi(subject).union(&to_geo_multi(clip), CLIPPER_FACTOR);
    from_geo_multi(&result)
}

/// Merge a set of potentially overlapping polygons into disjoint ExPolygons.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    match polygons.len() {
        0 => vec![],
        1 => polygons.iter().filter(|ex| !ex.is_empty()).cloned().collect(),
        n => {
            // Halving keeps each boolean pass small
            let (left, right) = polygons.split_at(n / 2);
            let left = union_ex(left);
            let right = union_ex(right);
            if left.is_empty() {
                return right;
            }
            if right.is_empty() {
                return left;
            }
            let result = to_geo_multi(&left).union(&to_geo_multi(&right), CLIPPER_FACTOR);
            from_geo_multi(&result)
        }
    }
}

/// Compute the intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let result = to_geo_multi(subject).intersection(&to_geo_multi(clip), CLIPPER_FACTOR);
    from_geo_multi(&result)
}

/// Compute the difference of two sets of polygons (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let result = to_geo_multi(subject).difference(&to_geo_multi(clip), CLIPPER_FACTOR);
    from_geo_multi(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset multiple ExPolygons by a given distance in mm.
///
/// Positive delta inflates (grows) the polygons, negative delta deflates (shrinks) them.
/// Overlapping results of a positive offset are merged.
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    if delta == 0.0 {
        return expolygons.to_vec();
    }

    let result = to_geo_multi(expolygons).offset(
        delta,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    let out = from_geo_multi(&result);
    if delta > 0.0 && out.len() > 1 {
        union_ex(&out)
    } else {
        out
    }
}

/// Grow (outset) ExPolygons by a given distance in mm.
pub fn grow(expolygons: &[ExPolygon], distance: CoordF) -> ExPolygons {
    offset_expolygons(expolygons, distance.abs(), OffsetJoinType::Miter)
}

/// Shrink (inset) ExPolygons by a given distance in mm.
pub fn shrink(expolygons: &[ExPolygon], distance: CoordF) -> ExPolygons {
    offset_expolygons(expolygons, -distance.abs(), OffsetJoinType::Miter)
}

/// Morphological opening: shrink then grow by the same amount.
///
/// Removes features narrower than twice `distance`.
pub fn opening(expolygons: &[ExPolygon], distance: CoordF) -> ExPolygons {
    if expolygons.is_empty() || distance <= 0.0 {
        return expolygons.to_vec();
    }
    grow(&shrink(expolygons, distance), distance)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Compute the total area of a set of polygons in mm².
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|p| p.area_mm2()).sum()
}

fn point_in_expolygons(p: &Point, region: &[ExPolygon]) -> bool {
    region.iter().any(|ex| ex.contains_point(p))
}

/// Intersect polylines with a set of ExPolygons, returning the pieces inside.
///
/// Each segment is split at every crossing with a contour or hole edge; a
/// piece is kept when its midpoint lies inside the region. Consecutive kept
/// pieces of one input polyline stay joined.
pub fn intersection_pl(polylines: &[Polyline], clip: &[ExPolygon]) -> Vec<Polyline> {
    if polylines.is_empty() || clip.is_empty() {
        return vec![];
    }

    let edges: Vec<Line> = clip
        .iter()
        .flat_map(|ex| {
            let mut lines: Vec<Line> = ex.contour.lines().collect();
            for h in &ex.holes {
                lines.extend(h.lines());
            }
            lines
        })
        .collect();

    let mut result = Vec::new();
    for polyline in polylines {
        let mut current: Vec<Point> = Vec::new();
        for seg in polyline.lines() {
            let mut ts: Vec<CoordF> = vec![0.0, 1.0];
            ts.extend(edges.iter().filter_map(|e| seg.intersection_param(e)));
            ts.sort_by(|a, b| a.total_cmp(b));
            ts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

            for w in ts.windows(2) {
                let a = seg.point_at(w[0]);
                let b = seg.point_at(w[1]);
                if a == b {
                    continue;
                }
                let mid = Line::new(a, b).midpoint();
                if point_in_expolygons(&mid, clip) {
                    if current.last() != Some(&a) {
                        if current.len() >= 2 {
                            result.push(Polyline::from_points(std::mem::take(&mut current)));
                        }
                        current.clear();
                        current.push(a);
                    }
                    current.push(b);
                } else if current.len() >= 2 {
                    result.push(Polyline::from_points(std::mem::take(&mut current)));
                } else {
                    current.clear();
                }
            }
        }
        if current.len() >= 2 {
            result.push(Polyline::from_points(current));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygon {
        ExPolygon::new(Polygon::square_mm(x, y, size))
    }

    #[test]
    fn test_union_merges_overlap() {
        let a = make_square_mm(0.0, 0.0, 10.0);
        let b = make_square_mm(5.0, 0.0, 10.0);
        let u = union(&[a], &[b]);
        assert_eq!(u.len(), 1);
        assert!((total_area(&u) - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_union_ex_many() {
        let squares: Vec<ExPolygon> = (0..5).map(|i| make_square_mm(i as f64 * 4.0, 0.0, 5.0)).collect();
        let u = union_ex(&squares);
        assert_eq!(u.len(), 1);
        assert!((total_area(&u) - 105.0).abs() < 0.01);
    }

    #[test]
    fn test_difference_makes_hole() {
        let outer = make_square_mm(0.0, 0.0, 10.0);
        let inner = make_square_mm(3.0, 3.0, 4.0);
        let d = difference(&[outer], &[inner]);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].holes.len(), 1);
        assert!((total_area(&d) - 84.0).abs() < 0.01);
    }

    #[test]
    fn test_intersection() {
        let a = make_square_mm(0.0, 0.0, 10.0);
        let b = make_square_mm(5.0, 5.0, 10.0);
        let i = intersection(&[a], &[b]);
        assert!((total_area(&i) - 25.0).abs() < 0.01);
        assert!(intersection(&[], &[make_square_mm(0.0, 0.0, 1.0)]).is_empty());
    }

    #[test]
    fn test_offsets() {
        let sq = make_square_mm(0.0, 0.0, 10.0);
        let grown = grow(&[sq.clone()], 1.0);
        assert!((total_area(&grown) - 144.0).abs() < 0.1);
        let shrunk = shrink(&[sq.clone()], 1.0);
        assert!((total_area(&shrunk) - 64.0).abs() < 0.1);
        assert!(shrink(&[sq], 6.0).is_empty());
    }

    #[test]
    fn test_opening_removes_thin_parts() {
        let thin = ExPolygon::new(Polygon::rectangle(
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 0.5),
        ));
        assert!(opening(&[thin], 0.5).is_empty());
    }

    #[test]
    fn test_intersection_pl_splits_at_hole() {
        let frame = ExPolygon::with_holes(
            Polygon::square_mm(0.0, 0.0, 20.0),
            vec![Polygon::square_mm(5.0, 5.0, 10.0)],
        );
        let line = Polyline::from_points(vec![
            Point::new_scale(-5.0, 10.0),
            Point::new_scale(25.0, 10.0),
        ]);
        let pieces = intersection_pl(&[line], &[frame]);
        assert_eq!(pieces.len(), 2);
        let total: f64 = pieces.iter().map(|p| p.length()).sum();
        assert!((total - scale(10.0) as f64).abs() < 10.0);
    }
}
