//! Support layer.

use super::SupportToolpath;
use crate::clipper::union_ex;
use crate::geometry::ExPolygons;
use crate::slice::{SurfaceCollection, SurfaceType};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// One layer of support material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportLayer {
    /// Index of the layer within the object's support layers.
    pub id: usize,
    /// Height of the layer's top (mm).
    pub print_z: CoordF,
    /// Layer thickness (mm).
    pub height: CoordF,
    /// Whether this layer belongs to the raft.
    pub is_raft: bool,
    /// Base, interface and pillar regions.
    pub support_regions: SurfaceCollection,
    /// Regions directly under the object, printed as a dense contact layer.
    pub contact: ExPolygons,
    /// Extrusion paths for this layer.
    pub toolpaths: Vec<SupportToolpath>,
}

impl SupportLayer {
    pub fn new(id: usize, print_z: CoordF, height: CoordF, is_raft: bool) -> Self {
        Self {
            id,
            print_z,
            height,
            is_raft,
            ..Default::default()
        }
    }

    #[inline]
    pub fn bottom_z(&self) -> CoordF {
        self.print_z - self.height
    }

    /// Regions of one kind; contact regions are not included.
    pub fn regions_of_type(&self, surface_type: SurfaceType) -> ExPolygons {
        self.support_regions.expolygons_of_type(surface_type)
    }

    /// Union of every region printed on this layer, contact included.
    pub fn all_regions(&self) -> ExPolygons {
        let mut all = self.support_regions.to_expolygons();
        all.extend(self.contact.iter().cloned());
        union_ex(&all)
    }

    pub fn is_empty(&self) -> bool {
        self.support_regions.is_empty() && self.contact.is_empty()
    }

    /// Total extrusion length of the layer (mm).
    pub fn extrusion_length(&self) -> CoordF {
        self.toolpaths.iter().map(SupportToolpath::length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area;
    use crate::geometry::{ExPolygon, Polygon};

    #[test]
    fn test_support_layer_regions() {
        let mut layer = SupportLayer::new(2, 1.0, 0.25, false);
        assert!(layer.is_empty());
        assert!((layer.bottom_z() - 0.75).abs() < 1e-9);

        layer.support_regions.append_expolygons(
            vec![ExPolygon::new(Polygon::square_mm(0.0, 0.0, 4.0))],
            SurfaceType::SupportBase,
        );
        layer.contact = vec![ExPolygon::new(Polygon::square_mm(2.0, 0.0, 4.0))];

        assert!(!layer.is_empty());
        assert_eq!(layer.regions_of_type(SurfaceType::SupportBase).len(), 1);
        assert!(layer.regions_of_type(SurfaceType::SupportInterface).is_empty());
        assert!((total_area(&layer.all_regions()) - 24.0).abs() < 0.01);
        assert_eq!(layer.extrusion_length(), 0.0);
    }
}
