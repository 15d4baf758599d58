//! Surface types for layer regions.
//!
//! A [`Surface`] is one typed region of a layer: an ExPolygon plus the
//! manufacturing metadata later stages need (thickness, bridge direction).
//!
//! Types are a closed enumeration. Stages that select several types at once
//! use a [`SurfaceTypes`] set instead of OR-ing flags together.

use crate::geometry::ExPolygon;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Classification of a surface within a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Top surface (visible from above).
    Top,
    /// Bottom surface (visible from below, or first layer).
    Bottom,
    /// Bottom surface that bridges over air.
    BottomBridge,
    /// Internal surface that will receive sparse infill.
    #[default]
    Internal,
    /// Internal solid surface (between top/bottom and infill).
    InternalSolid,
    /// Internal bridge surface.
    InternalBridge,
    /// Internal void (empty space, no infill).
    InternalVoid,
    /// Region covered by perimeters.
    InternalPerimeter,
    /// Sparse support fill.
    SupportBase,
    /// Dense support next to the object.
    SupportInterface,
    /// Discrete support column.
    SupportPillar,
}

impl SurfaceType {
    /// Every variant, in declaration order.
    pub const ALL: [SurfaceType; 11] = [
        SurfaceType::Top,
        SurfaceType::Bottom,
        SurfaceType::BottomBridge,
        SurfaceType::Internal,
        SurfaceType::InternalSolid,
        SurfaceType::InternalBridge,
        SurfaceType::InternalVoid,
        SurfaceType::InternalPerimeter,
        SurfaceType::SupportBase,
        SurfaceType::SupportInterface,
        SurfaceType::SupportPillar,
    ];

    /// Check if this surface type is a top surface.
    #[inline]
    pub fn is_top(&self) -> bool {
        matches!(self, SurfaceType::Top)
    }

    /// Check if this surface type is a bottom surface.
    #[inline]
    pub fn is_bottom(&self) -> bool {
        matches!(self, SurfaceType::Bottom | SurfaceType::BottomBridge)
    }

    /// Check if this surface type is a bridge.
    #[inline]
    pub fn is_bridge(&self) -> bool {
        matches!(self, SurfaceType::BottomBridge | SurfaceType::InternalBridge)
    }

    /// Check if this surface type requires solid infill.
    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            SurfaceType::Top
                | SurfaceType::Bottom
                | SurfaceType::BottomBridge
                | SurfaceType::InternalSolid
                | SurfaceType::InternalBridge
        )
    }

    /// Check if this surface type is internal (not top or bottom).
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SurfaceType::Internal
                | SurfaceType::InternalSolid
                | SurfaceType::InternalBridge
                | SurfaceType::InternalVoid
                | SurfaceType::InternalPerimeter
        )
    }

    /// Check if this surface belongs to generated support material.
    #[inline]
    pub fn is_support(&self) -> bool {
        matches!(
            self,
            SurfaceType::SupportBase | SurfaceType::SupportInterface | SurfaceType::SupportPillar
        )
    }

    /// Get a human-readable name for this surface type.
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Top => "top",
            SurfaceType::Bottom => "bottom",
            SurfaceType::BottomBridge => "bottom bridge",
            SurfaceType::Internal => "internal",
            SurfaceType::InternalSolid => "internal solid",
            SurfaceType::InternalBridge => "internal bridge",
            SurfaceType::InternalVoid => "internal void",
            SurfaceType::InternalPerimeter => "internal perimeter",
            SurfaceType::SupportBase => "support base",
            SurfaceType::SupportInterface => "support interface",
            SurfaceType::SupportPillar => "support pillar",
        }
    }

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl BitOr for SurfaceType {
    type Output = SurfaceTypes;

    fn bitor(self, rhs: SurfaceType) -> SurfaceTypes {
        SurfaceTypes::of(&[self, rhs])
    }
}

/// A set of surface types, used to filter collections by several types at once.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SurfaceTypes {
    bits: u16,
}

impl SurfaceTypes {
    /// The empty set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Set containing exactly the given types.
    pub fn of(types: &[SurfaceType]) -> Self {
        types.iter().fold(Self::empty(), |set, t| set.with(*t))
    }

    /// Top, bottom and bottom-bridge surfaces.
    pub fn external() -> Self {
        Self::of(&[SurfaceType::Top, SurfaceType::Bottom, SurfaceType::BottomBridge])
    }

    /// All internal surface types.
    pub fn internal() -> Self {
        SurfaceType::ALL
            .into_iter()
            .filter(SurfaceType::is_internal)
            .fold(Self::empty(), Self::with)
    }

    /// All support surface types.
    pub fn support() -> Self {
        SurfaceType::ALL
            .into_iter()
            .filter(SurfaceType::is_support)
            .fold(Self::empty(), Self::with)
    }

    /// This set with `t` added.
    #[must_use]
    pub fn with(self, t: SurfaceType) -> Self {
        Self {
            bits: self.bits | t.bit(),
        }
    }

    /// This set with `t` removed.
    #[must_use]
    pub fn without(self, t: SurfaceType) -> Self {
        Self {
            bits: self.bits & !t.bit(),
        }
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, t: SurfaceType) -> bool {
        self.bits & t.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = SurfaceType> + '_ {
        SurfaceType::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl From<SurfaceType> for SurfaceTypes {
    fn from(t: SurfaceType) -> Self {
        SurfaceTypes::empty().with(t)
    }
}

impl BitOr<SurfaceType> for SurfaceTypes {
    type Output = SurfaceTypes;

    fn bitor(self, rhs: SurfaceType) -> SurfaceTypes {
        self.with(rhs)
    }
}

impl BitOr for SurfaceTypes {
    type Output = SurfaceTypes;

    fn bitor(self, rhs: SurfaceTypes) -> SurfaceTypes {
        SurfaceTypes {
            bits: self.bits | rhs.bits,
        }
    }
}

impl fmt::Debug for SurfaceTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A surface is a classified region within a layer.
///
/// Each surface has a type (determining how it should be filled)
/// and geometry (the ExPolygon defining its shape).
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// The geometry of this surface.
    pub expolygon: ExPolygon,

    /// The type/classification of this surface.
    pub surface_type: SurfaceType,

    /// Vertical extent this surface represents, in mm. Negative when unknown.
    pub thickness: CoordF,

    /// Vertical extent in layers.
    pub thickness_layers: u16,

    /// Bridge angle in radians. None if not a bridge or not yet determined.
    pub bridge_angle: Option<CoordF>,

    /// Extra perimeters needed for this surface.
    pub extra_perimeters: u16,
}

impl Surface {
    /// Create a new surface with the given geometry and type.
    pub fn new(expolygon: ExPolygon, surface_type: SurfaceType) -> Self {
        Self {
            expolygon,
            surface_type,
            thickness: -1.0,
            thickness_layers: 1,
            bridge_angle: None,
            extra_perimeters: 0,
        }
    }

    /// Copy every non-geometric field of `template` onto new geometry.
    pub fn from_template(template: &Surface, expolygon: ExPolygon) -> Self {
        Self {
            expolygon,
            ..template.clone_metadata()
        }
    }

    fn clone_metadata(&self) -> Self {
        Self {
            expolygon: ExPolygon::default(),
            surface_type: self.surface_type,
            thickness: self.thickness,
            thickness_layers: self.thickness_layers,
            bridge_angle: self.bridge_angle,
            extra_perimeters: self.extra_perimeters,
        }
    }

    /// Create a new bridge surface.
    pub fn bridge(expolygon: ExPolygon, angle: Option<CoordF>) -> Self {
        Self {
            bridge_angle: angle,
            ..Self::new(expolygon, SurfaceType::BottomBridge)
        }
    }

    /// Check if this surface is empty (no geometry).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.expolygon.is_empty()
    }

    /// Area in mm².
    #[inline]
    pub fn area(&self) -> CoordF {
        self.expolygon.area_mm2()
    }

    #[inline]
    pub fn is_top(&self) -> bool {
        self.surface_type.is_top()
    }

    #[inline]
    pub fn is_bottom(&self) -> bool {
        self.surface_type.is_bottom()
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        self.surface_type.is_bridge()
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.surface_type.is_solid()
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.surface_type.is_internal()
    }

    #[inline]
    pub fn is_support(&self) -> bool {
        self.surface_type.is_support()
    }

    /// True if both surfaces share type, thickness, layer count and bridge angle.
    pub fn same_properties(&self, other: &Surface) -> bool {
        self.surface_type == other.surface_type
            && self.thickness == other.thickness
            && self.thickness_layers == other.thickness_layers
            && self.bridge_angle == other.bridge_angle
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Surface({:?}, area={:.2}mm²)",
            self.surface_type,
            self.area()
        )
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} surface (area={:.2}mm²)", self.surface_type, self.area())
    }
}

/// Type alias for a list of surfaces.
pub type Surfaces = Vec<Surface>;
