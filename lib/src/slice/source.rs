//! Sources of object cross-sections.
//!
//! Support generation only needs the outline of an object at a set of
//! heights. [`SliceSource`] abstracts where those outlines come from;
//! [`LayerStack`] is a simple source built from extruded polygons
//! ("prisms"), loadable from JSON.

use crate::clipper::union_ex;
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::{CoordF, Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Anything that can produce the cross-section of an object at given heights.
pub trait SliceSource: Send + Sync {
    /// Cross-sections at each of `z` (mm), in the same order.
    fn slice(&self, z: &[CoordF]) -> Result<Vec<ExPolygons>>;

    /// Total object height (mm).
    fn height(&self) -> CoordF;
}

/// A polygon extruded vertically between `z_min` and `z_max`.
///
/// Coordinates are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prism {
    pub z_min: CoordF,
    pub z_max: CoordF,
    pub contour: Vec<[CoordF; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[CoordF; 2]>>,
}

impl Prism {
    /// Axis-aligned box prism.
    pub fn cuboid(min: [CoordF; 3], max: [CoordF; 3]) -> Self {
        Self {
            z_min: min[2],
            z_max: max[2],
            contour: vec![
                [min[0], min[1]],
                [max[0], min[1]],
                [max[0], max[1]],
                [min[0], max[1]],
            ],
            holes: Vec::new(),
        }
    }

    /// Whether the plane at `z` cuts through this prism.
    #[inline]
    pub fn spans(&self, z: CoordF) -> bool {
        z >= self.z_min && z < self.z_max
    }

    pub fn to_expolygon(&self) -> ExPolygon {
        let ring = |pts: &[[CoordF; 2]]| {
            Polygon::from_points(pts.iter().map(|p| Point::new_scale(p[0], p[1])).collect())
        };
        ExPolygon::with_holes(ring(&self.contour), self.holes.iter().map(|h| ring(h)).collect())
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.z_max <= self.z_min {
            return Err(Error::Slicing(format!(
                "prism {}: z_max ({}) must be above z_min ({})",
                index, self.z_max, self.z_min
            )));
        }
        if self.contour.len() < 3 {
            return Err(Error::Slicing(format!(
                "prism {}: contour needs at least 3 points",
                index
            )));
        }
        Ok(())
    }
}

/// A stack of prisms forming an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    pub prisms: Vec<Prism>,
}

impl LayerStack {
    pub fn new(prisms: Vec<Prism>) -> Self {
        Self { prisms }
    }

    /// Parse a stack from JSON: `{"prisms": [{"z_min", "z_max", "contour", "holes"}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let stack: LayerStack = serde_json::from_str(json)?;
        stack.validate()?;
        Ok(stack)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.prisms
            .iter()
            .enumerate()
            .try_for_each(|(i, p)| p.validate(i))
    }

    pub fn push(&mut self, prism: Prism) {
        self.prisms.push(prism);
    }

    pub fn is_empty(&self) -> bool {
        self.prisms.is_empty()
    }

    /// Union of every prism spanning `z`.
    pub fn section_at(&self, z: CoordF) -> ExPolygons {
        let cut: ExPolygons = self
            .prisms
            .iter()
            .filter(|p| p.spans(z))
            .map(Prism::to_expolygon)
            .collect();
        match cut.len() {
            0 => Vec::new(),
            _ => union_ex(&cut),
        }
    }
}

impl SliceSource for LayerStack {
    fn slice(&self, z: &[CoordF]) -> Result<Vec<ExPolygons>> {
        Ok(z.par_iter().map(|&z| self.section_at(z)).collect())
    }

    fn height(&self) -> CoordF {
        self.prisms.iter().map(|p| p.z_max).fold(0.0, CoordF::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 10mm pillar carrying a 20mm plate from 5mm to 6mm.
    fn t_shape() -> LayerStack {
        LayerStack::new(vec![
            Prism::cuboid([5.0, 5.0, 0.0], [15.0, 15.0, 6.0]),
            Prism::cuboid([0.0, 0.0, 5.0], [20.0, 20.0, 6.0]),
        ])
    }

    #[test]
    fn test_section_at() {
        let stack = t_shape();
        let low = stack.section_at(1.0);
        assert_eq!(low.len(), 1);
        assert!((low[0].area_mm2() - 100.0).abs() < 0.01);

        let high = stack.section_at(5.5);
        assert_eq!(high.len(), 1);
        assert!((high[0].area_mm2() - 400.0).abs() < 0.01);

        assert!(stack.section_at(6.0).is_empty());
        assert!((stack.height() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_slice_keeps_order() {
        let stack = t_shape();
        let out = stack.slice(&[5.5, 1.0, 7.0]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0][0].area_mm2() > out[1][0].area_mm2());
        assert!(out[2].is_empty());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"prisms": [
            {"z_min": 0.0, "z_max": 2.0,
             "contour": [[0,0],[10,0],[10,10],[0,10]],
             "holes": [[[4,4],[4,6],[6,6],[6,4]]]}
        ]}"#;
        let stack = LayerStack::from_json(json).unwrap();
        let ex = stack.section_at(1.0);
        assert_eq!(ex.len(), 1);
        assert_eq!(ex[0].holes.len(), 1);
        assert!((ex[0].area_mm2() - 96.0).abs() < 0.01);
    }

    #[test]
    fn test_from_json_rejects_bad_prism() {
        let json = r#"{"prisms": [{"z_min": 2.0, "z_max": 1.0, "contour": [[0,0],[1,0],[1,1]]}]}"#;
        assert!(matches!(LayerStack::from_json(json), Err(Error::Slicing(_))));
        assert!(matches!(LayerStack::from_json("nope"), Err(Error::Json(_))));
    }
}
