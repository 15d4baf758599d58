//! Extrusion paths for support layers.

use super::{SupportGenerator, SupportLayer};
use crate::clipper::{intersection_pl, shrink};
use crate::config::SupportPattern;
use crate::flow::Flow;
use crate::geometry::{get_extents, ExPolygon, Point, Polyline};
use crate::slice::SurfaceType;
use crate::{scale, Coord, CoordF, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Density of the first layer flange.
const FIRST_LAYER_DENSITY: CoordF = 0.5;

/// What a support toolpath prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolpathRole {
    Raft,
    Base,
    Interface,
    Contact,
    Pillar,
}

impl ToolpathRole {
    pub fn name(&self) -> &'static str {
        match self {
            ToolpathRole::Raft => "raft",
            ToolpathRole::Base => "base",
            ToolpathRole::Interface => "interface",
            ToolpathRole::Contact => "contact",
            ToolpathRole::Pillar => "pillar",
        }
    }
}

impl fmt::Display for ToolpathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A group of extrusions sharing role and cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportToolpath {
    pub role: ToolpathRole,
    pub polylines: Vec<Polyline>,
    /// Extrusion width (mm).
    pub width: CoordF,
    /// Extrusion height (mm).
    pub height: CoordF,
}

impl SupportToolpath {
    /// Total extrusion length (mm).
    pub fn length(&self) -> CoordF {
        self.polylines.iter().map(Polyline::length).sum::<CoordF>() / crate::SCALING_FACTOR
    }
}

/// Parallel lines `spacing` mm apart at `angle` degrees, clipped to `regions`.
pub(crate) fn fill_lines(regions: &[ExPolygon], spacing: CoordF, angle: CoordF) -> Vec<Polyline> {
    let spacing = scale(spacing);
    if regions.is_empty() || spacing <= 0 {
        return Vec::new();
    }
    let bbox = get_extents(regions);
    if !bbox.defined {
        return Vec::new();
    }

    let (sin_a, cos_a) = angle.to_radians().sin_cos();
    let center = bbox.center();
    let size = bbox.size();
    let half_diag = ((size.x as f64).hypot(size.y as f64) / 2.0) as Coord + spacing;
    let num_lines = half_diag / spacing;

    let lines: Vec<Polyline> = (-num_lines..=num_lines)
        .map(|i| {
            let offset = (i * spacing) as f64;
            // offset across the lines, extend along them
            let px = center.x as f64 + offset * -sin_a;
            let py = center.y as f64 + offset * cos_a;
            let dx = cos_a * half_diag as f64;
            let dy = sin_a * half_diag as f64;
            Polyline::from_points(vec![
                Point::new((px - dx) as Coord, (py - dy) as Coord),
                Point::new((px + dx) as Coord, (py + dy) as Coord),
            ])
        })
        .collect();

    intersection_pl(&lines, regions)
}

/// Closed outlines of `regions`.
fn loops(regions: &[ExPolygon]) -> Vec<Polyline> {
    regions
        .iter()
        .flat_map(|ex| ex.to_polygons())
        .filter(|p| p.is_valid())
        .map(|p| Polyline::from_polygon(&p))
        .collect()
}

impl SupportGenerator<'_> {
    fn toolpath(role: ToolpathRole, polylines: Vec<Polyline>, flow: &Flow, height: CoordF) -> Option<SupportToolpath> {
        if polylines.is_empty() {
            return None;
        }
        Some(SupportToolpath {
            role,
            polylines,
            width: flow.width,
            height,
        })
    }

    fn layer_toolpaths(&self, layer: &SupportLayer) -> Vec<SupportToolpath> {
        let config = self.object_config;
        let angle = config.support_material_angle;
        let base_spacing = config.support_material_spacing + self.flow.spacing();
        let interface_spacing =
            config.support_material_interface_spacing + self.interface_flow.spacing();
        let mut paths = Vec::new();

        // contact: an outline plus a dense fill
        if !layer.contact.is_empty() {
            let half = self.interface_flow.width / 2.0;
            let mut polylines = loops(&shrink(&layer.contact, half));
            polylines.extend(fill_lines(
                &shrink(&layer.contact, self.interface_flow.width),
                interface_spacing,
                angle + 90.0,
            ));
            paths.extend(Self::toolpath(
                ToolpathRole::Contact,
                polylines,
                &self.interface_flow,
                layer.height,
            ));
        }

        let interface = layer.support_regions.expolygons_of_type(SurfaceType::SupportInterface);
        paths.extend(Self::toolpath(
            ToolpathRole::Interface,
            fill_lines(&interface, interface_spacing, angle + 90.0),
            &self.interface_flow,
            layer.height,
        ));

        let base = layer.support_regions.expolygons_of_type(SurfaceType::SupportBase);
        if layer.id == 0 {
            // base flange, not aligned with the pattern above
            let flow = &self.first_layer_flow;
            paths.extend(Self::toolpath(
                if layer.is_raft { ToolpathRole::Raft } else { ToolpathRole::Base },
                fill_lines(&base, flow.spacing() / FIRST_LAYER_DENSITY, angle + 90.0),
                flow,
                layer.height,
            ));
        } else {
            let layer_angle = match config.support_material_pattern {
                SupportPattern::RectilinearGrid if layer.id % 2 == 1 => angle + 90.0,
                _ => angle,
            };
            paths.extend(Self::toolpath(
                if layer.is_raft { ToolpathRole::Raft } else { ToolpathRole::Base },
                fill_lines(&base, base_spacing, layer_angle),
                &self.flow,
                layer.height,
            ));
        }

        // pillars are crossed on every layer to stay rigid
        let pillars = layer.support_regions.expolygons_of_type(SurfaceType::SupportPillar);
        if !pillars.is_empty() {
            let mut polylines = fill_lines(&pillars, base_spacing, angle);
            polylines.extend(fill_lines(&pillars, base_spacing, angle + 90.0));
            paths.extend(Self::toolpath(
                ToolpathRole::Pillar,
                polylines,
                &self.flow,
                layer.height,
            ));
        }

        paths
    }

    /// Generate the extrusion paths of every support layer.
    pub(crate) fn generate_toolpaths(&self, layers: &mut [SupportLayer]) -> Result<()> {
        layers.par_iter_mut().try_for_each(|layer| {
            self.check_cancelled()?;
            layer.toolpaths = self.layer_toolpaths(layer);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PrintConfig, PrintObjectConfig};
    use crate::geometry::{ExPolygons, Polygon};

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygons {
        vec![ExPolygon::new(Polygon::square_mm(x, y, size))]
    }

    #[test]
    fn test_fill_lines_spacing() {
        let lines = fill_lines(&make_square_mm(0.0, 0.0, 10.0), 1.0, 0.0);
        // horizontal lines across a 10mm square, 1mm apart
        assert!(lines.len() >= 9 && lines.len() <= 11);
        for line in &lines {
            let (a, b) = (line.first_point().unwrap(), line.last_point().unwrap());
            assert_eq!(a.y, b.y);
            assert!((line.length() / crate::SCALING_FACTOR - 10.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_fill_lines_rotated() {
        let lines = fill_lines(&make_square_mm(0.0, 0.0, 10.0), 1.0, 90.0);
        assert!(!lines.is_empty());
        for line in &lines {
            let (a, b) = (line.first_point().unwrap(), line.last_point().unwrap());
            assert!((a.x - b.x).abs() <= 1);
        }
        assert!(fill_lines(&[], 1.0, 0.0).is_empty());
        assert!(fill_lines(&make_square_mm(0.0, 0.0, 10.0), 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_layer_toolpaths_roles() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let mut layer = SupportLayer::new(3, 1.25, 0.3, false);
        layer
            .support_regions
            .append_expolygons(make_square_mm(0.0, 0.0, 10.0), SurfaceType::SupportBase);
        layer
            .support_regions
            .append_expolygons(make_square_mm(20.0, 0.0, 10.0), SurfaceType::SupportInterface);
        layer.contact = make_square_mm(40.0, 0.0, 10.0);

        let mut layers = vec![layer];
        generator.generate_toolpaths(&mut layers).unwrap();
        let roles: Vec<ToolpathRole> = layers[0].toolpaths.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![ToolpathRole::Contact, ToolpathRole::Interface, ToolpathRole::Base]
        );

        let interface = &layers[0].toolpaths[1];
        let base = &layers[0].toolpaths[2];
        // interface is dense, base is sparse
        assert!(interface.length() > base.length() * 2.0);
        assert!((base.height - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_first_layer_raft_role() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig::default().raft_layers(2);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let mut layer = SupportLayer::new(0, 0.35, 0.35, true);
        layer
            .support_regions
            .append_expolygons(make_square_mm(0.0, 0.0, 10.0), SurfaceType::SupportBase);
        let mut layers = vec![layer];
        generator.generate_toolpaths(&mut layers).unwrap();
        assert_eq!(layers[0].toolpaths.len(), 1);
        assert_eq!(layers[0].toolpaths[0].role, ToolpathRole::Raft);
        assert!((layers[0].toolpaths[0].width - generator.first_layer_flow().width).abs() < 1e-9);
    }
}
