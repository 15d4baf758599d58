//! Extrusion flow model.
//!
//! A [`Flow`] describes the cross-section of an extruded line: its width,
//! its height (the layer thickness) and the nozzle that produced it. The
//! support generator only reads widths and spacings from it.

use crate::config::{PrintConfig, PrintObjectConfig};
use crate::{scale, Coord, CoordF};
use std::f64::consts::PI;
use thiserror::Error;

/// Extra spacing between adjacent bridge extrusions (mm).
pub const BRIDGE_EXTRA_SPACING: CoordF = 0.05;

/// Invalid flow parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error("negative extrusion width {0}")]
    NegativeWidth(CoordF),
    #[error("layer height must be positive, got {0}")]
    InvalidHeight(CoordF),
    #[error("nozzle diameter must be positive, got {0}")]
    InvalidNozzle(CoordF),
}

/// What an extrusion is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowRole {
    SupportMaterial,
    SupportMaterialInterface,
}

/// Extrusion cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    /// Extrusion width (mm).
    pub width: CoordF,
    /// Extrusion height (mm).
    pub height: CoordF,
    /// Nozzle diameter (mm).
    pub nozzle_diameter: CoordF,
    /// Bridge extrusions are round, with the nozzle diameter as width.
    pub bridge: bool,
}

impl Flow {
    pub fn new(width: CoordF, height: CoordF, nozzle_diameter: CoordF) -> Self {
        Self {
            width,
            height,
            nozzle_diameter,
            bridge: false,
        }
    }

    /// Build a flow from a configured width, where `0` means automatic.
    ///
    /// A bridge flow ignores the configured width and uses the nozzle
    /// diameter scaled by `sqrt(bridge_flow_ratio)` for both dimensions.
    pub fn new_from_config_width(
        _role: FlowRole,
        width: CoordF,
        nozzle_diameter: CoordF,
        height: CoordF,
        bridge_flow_ratio: CoordF,
    ) -> Result<Self, FlowError> {
        if width < 0.0 {
            return Err(FlowError::NegativeWidth(width));
        }
        if nozzle_diameter <= 0.0 {
            return Err(FlowError::InvalidNozzle(nozzle_diameter));
        }

        if bridge_flow_ratio > 0.0 && bridge_flow_ratio != 1.0 {
            let w = nozzle_diameter * bridge_flow_ratio.sqrt();
            return Ok(Self {
                width: w,
                height: w,
                nozzle_diameter,
                bridge: true,
            });
        }

        if height <= 0.0 {
            return Err(FlowError::InvalidHeight(height));
        }

        let width = if width == 0.0 {
            Self::auto_extrusion_width(nozzle_diameter, height)
        } else {
            width
        };
        Ok(Self::new(width, height, nozzle_diameter))
    }

    /// Width of an extrusion whose cross-section area matches a round
    /// nozzle's, clamped to a sensible range around the nozzle size.
    pub fn auto_extrusion_width(nozzle_diameter: CoordF, height: CoordF) -> CoordF {
        let volume = (nozzle_diameter * nozzle_diameter * PI + height * height * (4.0 - PI)) / 4.0;
        let width = volume / height;
        width.clamp(nozzle_diameter * 1.05, nozzle_diameter * 1.25)
    }

    /// Centre-to-centre distance between adjacent extrusions (mm).
    pub fn spacing(&self) -> CoordF {
        if self.bridge {
            self.width + BRIDGE_EXTRA_SPACING
        } else {
            self.width - self.height * (1.0 - PI / 4.0)
        }
    }

    #[inline]
    pub fn scaled_width(&self) -> Coord {
        scale(self.width)
    }

    #[inline]
    pub fn scaled_spacing(&self) -> Coord {
        scale(self.spacing())
    }
}

/// Flow used for support body layers above the first one.
pub fn support_material_flow(
    print: &PrintConfig,
    object: &PrintObjectConfig,
    layer_height: CoordF,
) -> Result<Flow, FlowError> {
    Flow::new_from_config_width(
        FlowRole::SupportMaterial,
        object.support_material_extrusion_width,
        print.nozzle_diameter,
        layer_height,
        1.0,
    )
}

/// Flow used for support on the first layer.
pub fn support_material_1st_layer_flow(
    print: &PrintConfig,
    object: &PrintObjectConfig,
) -> Result<Flow, FlowError> {
    let width = if print.first_layer_extrusion_width > 0.0 {
        print.first_layer_extrusion_width
    } else {
        object.support_material_extrusion_width
    };
    Flow::new_from_config_width(
        FlowRole::SupportMaterial,
        width,
        print.nozzle_diameter,
        object.first_layer_height,
        1.0,
    )
}

/// Flow used for support interface layers.
pub fn support_material_interface_flow(
    print: &PrintConfig,
    object: &PrintObjectConfig,
    layer_height: CoordF,
) -> Result<Flow, FlowError> {
    Flow::new_from_config_width(
        FlowRole::SupportMaterialInterface,
        object.support_material_extrusion_width,
        print.nozzle_diameter,
        layer_height,
        1.0,
    )
}
