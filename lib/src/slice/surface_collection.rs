//! Ordered collection of typed surfaces.
//!
//! A [`SurfaceCollection`] is built per layer and per processing stage,
//! filtered and regrouped, then flattened into plain geometry for the next
//! stage. Insertion order is preserved and nothing is merged implicitly:
//! overlapping surfaces are legal until a later clipping pass resolves them.

use super::surface::{Surface, SurfaceType, SurfaceTypes, Surfaces};
use crate::geometry::{Containment, ExPolygons, Polygons};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection of surfaces with filtering, grouping and simplification.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCollection {
    pub surfaces: Surfaces,
}

impl SurfaceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_surfaces(surfaces: Surfaces) -> Self {
        Self { surfaces }
    }

    /// One surface of `surface_type` per ExPolygon.
    pub fn from_expolygons(expolygons: ExPolygons, surface_type: SurfaceType) -> Self {
        let mut c = Self::new();
        c.append_expolygons(expolygons, surface_type);
        c
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Surface> {
        self.surfaces.iter()
    }

    pub fn push(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Surfaces whose type is exactly `surface_type`.
    pub fn filter_by_type(&self, surface_type: SurfaceType) -> Vec<&Surface> {
        self.surfaces
            .iter()
            .filter(|s| s.surface_type == surface_type)
            .collect()
    }

    /// Surfaces whose type is a member of `types`.
    pub fn filter_by_types(&self, types: SurfaceTypes) -> Vec<&Surface> {
        self.surfaces
            .iter()
            .filter(|s| types.contains(s.surface_type))
            .collect()
    }

    /// Mutable references to the surfaces of type `surface_type`.
    pub fn filter_by_type_mut(&mut self, surface_type: SurfaceType) -> Vec<&mut Surface> {
        self.surfaces
            .iter_mut()
            .filter(|s| s.surface_type == surface_type)
            .collect()
    }

    /// Geometry of the surfaces of `surface_type`, cloned.
    pub fn expolygons_of_type(&self, surface_type: SurfaceType) -> ExPolygons {
        self.filter_by_type(surface_type)
            .into_iter()
            .map(|s| s.expolygon.clone())
            .collect()
    }

    pub fn has_type(&self, surface_type: SurfaceType) -> bool {
        self.surfaces.iter().any(|s| s.surface_type == surface_type)
    }

    /// True if some internal surface fully contains `shape`.
    pub fn any_internal_contains<T: Containment + ?Sized>(&self, shape: &T) -> bool {
        self.surfaces
            .iter()
            .any(|s| s.is_internal() && s.expolygon.contains(shape))
    }

    /// True if some bottom surface fully contains `shape`.
    pub fn any_bottom_contains<T: Containment + ?Sized>(&self, shape: &T) -> bool {
        self.surfaces
            .iter()
            .any(|s| s.is_bottom() && s.expolygon.contains(shape))
    }

    /// Total contour count: one outer contour plus the holes of every surface.
    pub fn polygons_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.expolygon.num_contours()).sum()
    }

    /// Total area in mm².
    pub fn total_area(&self) -> CoordF {
        self.surfaces.iter().map(|s| s.area()).sum()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    pub fn remove_type(&mut self, surface_type: SurfaceType) {
        self.surfaces.retain(|s| s.surface_type != surface_type);
    }

    pub fn remove_types(&mut self, types: SurfaceTypes) {
        self.surfaces.retain(|s| !types.contains(s.surface_type));
    }

    pub fn keep_type(&mut self, surface_type: SurfaceType) {
        self.surfaces.retain(|s| s.surface_type == surface_type);
    }

    pub fn keep_types(&mut self, types: SurfaceTypes) {
        self.surfaces.retain(|s| types.contains(s.surface_type));
    }

    /// Retype every surface.
    pub fn set_type(&mut self, surface_type: SurfaceType) {
        for s in &mut self.surfaces {
            s.surface_type = surface_type;
        }
    }

    /// Append copies of every surface of `other`.
    pub fn append(&mut self, other: &SurfaceCollection) {
        self.surfaces.extend(other.surfaces.iter().cloned());
    }

    pub fn append_surfaces(&mut self, surfaces: Surfaces) {
        self.surfaces.extend(surfaces);
    }

    /// One new surface per ExPolygon, copying every other field from `template`.
    pub fn append_expolygons_from(&mut self, expolygons: ExPolygons, template: &Surface) {
        self.surfaces.extend(
            expolygons
                .into_iter()
                .map(|ex| Surface::from_template(template, ex)),
        );
    }

    /// One fresh surface of `surface_type` per ExPolygon.
    pub fn append_expolygons(&mut self, expolygons: ExPolygons, surface_type: SurfaceType) {
        self.surfaces.extend(
            expolygons
                .into_iter()
                .map(|ex| Surface::new(ex, surface_type)),
        );
    }

    /// Simplify every surface with Douglas-Peucker (`tolerance` in mm).
    ///
    /// A surface may split into several; each piece keeps the original's
    /// type, thickness and bridge angle. Pieces that collapse are dropped.
    pub fn simplify(&mut self, tolerance: CoordF) {
        let surfaces = std::mem::take(&mut self.surfaces);
        for surface in surfaces {
            for ex in surface.expolygon.simplify(tolerance) {
                self.surfaces.push(Surface::from_template(&surface, ex));
            }
        }
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Partition into groups of surfaces with identical type, thickness,
    /// thickness layers and bridge angle.
    ///
    /// Groups appear in order of first encounter and keep encounter order.
    pub fn group(&self) -> Vec<Vec<&Surface>> {
        self.group_by(|a, b| a.same_properties(b))
    }

    /// Partition with a caller-supplied merge predicate.
    ///
    /// A surface joins the first group whose first member `can_merge` with
    /// it; otherwise it starts a new group.
    pub fn group_by<F>(&self, can_merge: F) -> Vec<Vec<&Surface>>
    where
        F: Fn(&Surface, &Surface) -> bool,
    {
        let mut groups: Vec<Vec<&Surface>> = Vec::new();
        for surface in &self.surfaces {
            match groups.iter_mut().find(|g| can_merge(g[0], surface)) {
                Some(group) => group.push(surface),
                None => groups.push(vec![surface]),
            }
        }
        groups
    }

    // ------------------------------------------------------------------
    // Flattening
    // ------------------------------------------------------------------

    /// All contours and holes, discarding type metadata.
    pub fn to_polygons(&self) -> Polygons {
        self.surfaces
            .iter()
            .flat_map(|s| s.expolygon.to_polygons())
            .collect()
    }

    /// All ExPolygons, discarding type metadata.
    pub fn to_expolygons(&self) -> ExPolygons {
        self.surfaces.iter().map(|s| s.expolygon.clone()).collect()
    }
}

impl From<&SurfaceCollection> for Polygons {
    fn from(c: &SurfaceCollection) -> Self {
        c.to_polygons()
    }
}

impl From<&SurfaceCollection> for ExPolygons {
    fn from(c: &SurfaceCollection) -> Self {
        c.to_expolygons()
    }
}

impl From<Surfaces> for SurfaceCollection {
    fn from(surfaces: Surfaces) -> Self {
        Self { surfaces }
    }
}

impl FromIterator<Surface> for SurfaceCollection {
    fn from_iter<I: IntoIterator<Item = Surface>>(iter: I) -> Self {
        Self {
            surfaces: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SurfaceCollection {
    type Item = Surface;
    type IntoIter = std::vec::IntoIter<Surface>;

    fn into_iter(self) -> Self::IntoIter {
        self.surfaces.into_iter()
    }
}

impl<'a> IntoIterator for &'a SurfaceCollection {
    type Item = &'a Surface;
    type IntoIter = std::slice::Iter<'a, Surface>;

    fn into_iter(self) -> Self::IntoIter {
        self.surfaces.iter()
    }
}

impl fmt::Debug for SurfaceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SurfaceCollection ({} surfaces):", self.surfaces.len())?;
        for (i, surface) in self.surfaces.iter().enumerate() {
            writeln!(f, "  [{}] {:?}", i, surface)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ExPolygon, Point, Polygon, Polyline};

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygon {
        ExPolygon::new(Polygon::square_mm(x, y, size))
    }

    fn sample() -> SurfaceCollection {
        let mut c = SurfaceCollection::new();
        c.push(Surface::new(make_square_mm(0.0, 0.0, 10.0), SurfaceType::Top));
        c.push(Surface::new(make_square_mm(20.0, 0.0, 10.0), SurfaceType::Internal));
        c.push(Surface::new(make_square_mm(40.0, 0.0, 10.0), SurfaceType::Bottom));
        c.push(Surface::new(make_square_mm(60.0, 0.0, 10.0), SurfaceType::Top));
        c.push(Surface::bridge(make_square_mm(80.0, 0.0, 10.0), Some(0.3)));
        c
    }

    #[test]
    fn test_filter_by_type_exact_and_set() {
        let c = sample();
        assert_eq!(c.filter_by_type(SurfaceType::Top).len(), 2);
        assert_eq!(c.filter_by_type(SurfaceType::Bottom).len(), 1);
        assert_eq!(c.filter_by_types(SurfaceTypes::external()).len(), 4);
        assert_eq!(
            c.filter_by_types(SurfaceType::Bottom | SurfaceType::Internal).len(),
            2
        );
        assert!(c.filter_by_types(SurfaceTypes::empty()).is_empty());
    }

    #[test]
    fn test_remove_type_then_filter_is_empty() {
        let mut c = sample();
        c.remove_type(SurfaceType::Top);
        assert!(c.filter_by_type(SurfaceType::Top).is_empty());
        assert_eq!(c.len(), 3);
        // order of survivors preserved
        assert_eq!(c.surfaces[0].surface_type, SurfaceType::Internal);
        assert_eq!(c.surfaces[1].surface_type, SurfaceType::Bottom);
    }

    #[test]
    fn test_keep_type_then_filter_others_is_empty() {
        for keep in SurfaceType::ALL {
            let mut c = sample();
            c.keep_type(keep);
            for other in SurfaceType::ALL.into_iter().filter(|t| *t != keep) {
                assert!(c.filter_by_type(other).is_empty());
            }
        }
    }

    #[test]
    fn test_remove_and_keep_types() {
        let mut c = sample();
        c.remove_types(SurfaceType::Top | SurfaceType::Bottom);
        assert_eq!(c.len(), 2);

        let mut c = sample();
        c.keep_types(SurfaceType::Top | SurfaceType::BottomBridge);
        assert_eq!(c.len(), 3);
        assert!(!c.has_type(SurfaceType::Internal));
    }

    #[test]
    fn test_any_internal_and_bottom_contains() {
        let c = sample();
        let inner = Point::new_scale(25.0, 5.0);
        assert!(c.any_internal_contains(&inner));
        assert!(!c.any_internal_contains(&Point::new_scale(5.0, 5.0)));

        let line = Polyline::from_points(vec![
            Point::new_scale(41.0, 1.0),
            Point::new_scale(49.0, 9.0),
        ]);
        assert!(c.any_bottom_contains(&line));
        // bottom bridge counts as bottom
        assert!(c.any_bottom_contains(&Polygon::square_mm(81.0, 1.0, 2.0)));
        assert!(!c.any_bottom_contains(&Polygon::square_mm(45.0, 1.0, 10.0)));
    }

    #[test]
    fn test_append_variants_never_merge() {
        let mut c = SurfaceCollection::new();
        c.append_expolygons(
            vec![make_square_mm(0.0, 0.0, 5.0), make_square_mm(0.0, 0.0, 5.0)],
            SurfaceType::SupportBase,
        );
        assert_eq!(c.len(), 2);

        let mut template = Surface::bridge(make_square_mm(0.0, 0.0, 1.0), Some(1.2));
        template.thickness = 0.6;
        c.append_expolygons_from(vec![make_square_mm(10.0, 0.0, 5.0)], &template);
        assert_eq!(c.len(), 3);
        assert_eq!(c.surfaces[2].bridge_angle, Some(1.2));
        assert_eq!(c.surfaces[2].thickness, 0.6);

        let other = sample();
        c.append(&other);
        assert_eq!(c.len(), 8);
        c.append_surfaces(vec![Surface::new(make_square_mm(0.0, 0.0, 1.0), SurfaceType::Top)]);
        assert_eq!(c.len(), 9);
    }

    #[test]
    fn test_group_is_partition() {
        let mut c = sample();
        let mut thick = Surface::new(make_square_mm(0.0, 20.0, 5.0), SurfaceType::Top);
        thick.thickness = 0.8;
        c.push(thick);

        let groups = c.group();
        // top, internal, bottom, bridge, thick top
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), c.len());

        // every surface appears exactly once
        for s in &c.surfaces {
            let hits = groups
                .iter()
                .flatten()
                .filter(|g| std::ptr::eq(**g, s))
                .count();
            assert_eq!(hits, 1);
        }
        // first-encounter order
        assert!(std::ptr::eq(groups[0][0], &c.surfaces[0]));
        assert!(std::ptr::eq(groups[0][1], &c.surfaces[3]));
    }

    #[test]
    fn test_group_by_predicate() {
        let c = sample();
        let groups = c.group_by(|a, b| a.is_solid() == b.is_solid());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_polygons_count_and_flatten() {
        let mut c = sample();
        c.push(Surface::new(
            ExPolygon::with_holes(
                Polygon::square_mm(0.0, 50.0, 10.0),
                vec![Polygon::square_mm(2.0, 52.0, 2.0), Polygon::square_mm(6.0, 56.0, 2.0)],
            ),
            SurfaceType::Internal,
        ));
        assert_eq!(c.polygons_count(), 5 + 3);
        assert_eq!(c.to_polygons().len(), 8);
        assert_eq!(c.to_expolygons().len(), 6);
        let polys: Polygons = (&c).into();
        assert_eq!(polys.len(), 8);
    }

    #[test]
    fn test_simplify_keeps_metadata_and_area() {
        let mut pts = Vec::new();
        for i in 0..=20 {
            pts.push(Point::new_scale(i as f64 * 0.5, 0.0002 * (i % 2) as f64));
        }
        pts.push(Point::new_scale(10.0, 10.0));
        pts.push(Point::new_scale(0.0, 10.0));
        let mut surface = Surface::bridge(ExPolygon::new(Polygon::from_points(pts)), Some(0.7));
        surface.thickness = 0.4;
        let before = surface.area();

        let mut c = SurfaceCollection::from_surfaces(vec![surface]);
        c.simplify(0.01);
        assert_eq!(c.len(), 1);
        assert_eq!(c.surfaces[0].bridge_angle, Some(0.7));
        assert_eq!(c.surfaces[0].thickness, 0.4);
        assert!(c.surfaces[0].expolygon.contour.len() < 10);
        assert!((c.total_area() - before).abs() < 0.01 * 10.0);
    }

    #[test]
    fn test_empty_collection_operations() {
        let mut c = SurfaceCollection::new();
        assert!(c.filter_by_type(SurfaceType::Top).is_empty());
        assert!(c.group().is_empty());
        assert_eq!(c.polygons_count(), 0);
        c.simplify(0.1);
        c.remove_type(SurfaceType::Top);
        c.keep_types(SurfaceTypes::external());
        assert!(c.to_polygons().is_empty());
        assert!(!c.any_internal_contains(&Point::zero()));
    }
}
