//! # Slicer Support
//!
//! Support material synthesis and surface bookkeeping for a 3D-printing slicer,
//! plus 3MF package import/export for the model tree that feeds it.
//!
//! This library provides:
//! - Typed surface regions and the [`SurfaceCollection`] used by every layer stage
//! - A support-material generator (contact areas, interface layers, base fill,
//!   pillars, raft) producing one region set per support layer
//! - A [`Print`]/[`PrintObject`] driver that slices layer sources and owns supports
//! - 3MF reading and writing of [`Model`] trees
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicer_support::{LayerStack, Print};
//!
//! let stack = LayerStack::from_json_file("object.json")?;
//! let mut print = Print::new();
//! print.default_object_config.set_deserialize("support_material", "1")?;
//! let idx = print.add_object(Box::new(stack));
//! print.get_object_mut(idx).unwrap().generate_support_material()?;
//! ```

pub mod clipper;
pub mod config;
pub mod flow;
pub mod geometry;
pub mod io;
pub mod model;
pub mod print;
pub mod slice;
pub mod support;

pub use config::{PrintConfig, PrintObjectConfig, SupportPattern};
pub use flow::{
    support_material_1st_layer_flow, support_material_flow, support_material_interface_flow, Flow,
    FlowError, FlowRole, BRIDGE_EXTRA_SPACING,
};
pub use geometry::{BoundingBox, ExPolygon, ExPolygons, Line, Point, Polygon, Polyline};
pub use io::tmf::{read_tmf, read_tmf_file, write_tmf, write_tmf_file};
pub use model::{
    BoundingBox3, ConfigMap, Model, ModelInstance, ModelMaterial, ModelObject, ModelVolume,
    TriangleMesh,
};
pub use print::{Print, PrintObject};
pub use slice::{
    Layer, LayerStack, Prism, SliceSource, Surface, SurfaceCollection, SurfaceType, SurfaceTypes,
};
pub use support::{
    SupportGenerator, SupportLayer, SupportToolpath, ToolpathRole, MARGIN, MARGIN_STEP,
    PILLAR_SIZE, PILLAR_SPACING,
};

/// Coordinate type used throughout the slicer.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Tolerance used when comparing Z heights in mm.
pub const EPSILON: f64 = 1e-4;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Slicing error: {0}")]
    Slicing(String),

    #[error("3MF error: {0}")]
    Tmf(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(scale(1.0), 1_000_000);
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);
        assert_eq!(scale(0.001), 1_000);
        assert_eq!(scale(-2.5), -2_500_000);
    }

    #[test]
    fn test_error_display() {
        let err = Error::Tmf("missing attribute 'id'".into());
        assert_eq!(err.to_string(), "3MF error: missing attribute 'id'");
        assert_eq!(Error::Cancelled.to_string(), "Cancelled");
    }
}
