//! Path simplification.
//!
//! Douglas-Peucker reduction of open and closed paths, used when a surface
//! collection is simplified before it is handed to a toolpath stage.

use super::{Line, Point, Polygon, Polyline};
use crate::{scale, CoordF};

/// Douglas-Peucker line simplification algorithm.
///
/// Removes points that lie within `tolerance` (mm) of the segment joining
/// the points kept around them. The first and last points are always kept.
pub fn douglas_peucker(points: &[Point], tolerance: CoordF) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let tolerance_sq = scale(tolerance) as f64 * scale(tolerance) as f64;

    // Stack-based to keep deep inputs off the call stack
    let mut stack = vec![(0, points.len() - 1)];
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    while let Some((anchor_idx, floater_idx)) = stack.pop() {
        if anchor_idx + 1 >= floater_idx {
            continue;
        }

        let anchor = points[anchor_idx];
        let floater = points[floater_idx];

        let mut max_dist_sq = 0.0;
        let mut furthest_idx = anchor_idx;
        for (i, p) in points.iter().enumerate().take(floater_idx).skip(anchor_idx + 1) {
            let dist_sq = Line::distance_to_squared(*p, anchor, floater);
            if dist_sq > max_dist_sq {
                max_dist_sq = dist_sq;
                furthest_idx = i;
            }
        }

        if max_dist_sq > tolerance_sq {
            keep[furthest_idx] = true;
            stack.push((anchor_idx, furthest_idx));
            stack.push((furthest_idx, floater_idx));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Douglas-Peucker simplification for a closed polygon.
///
/// The ring is opened at its first vertex and closed again so the closing
/// edge takes part in the reduction. Returns an empty polygon if fewer than
/// three vertices survive.
pub fn douglas_peucker_polygon(polygon: &Polygon, tolerance: CoordF) -> Polygon {
    let points = polygon.points();
    if points.len() <= 3 {
        return polygon.clone();
    }

    let mut ring = points.to_vec();
    ring.push(points[0]);
    let simplified = douglas_peucker(&ring, tolerance);

    // from_points drops the repeated closing vertex
    let result = Polygon::from_points(simplified);
    if result.is_valid() {
        result
    } else {
        Polygon::new()
    }
}

/// Douglas-Peucker simplification for a polyline.
pub fn douglas_peucker_polyline(polyline: &Polyline, tolerance: CoordF) -> Polyline {
    Polyline::from_points(douglas_peucker(polyline.points(), tolerance))
}
