//! Support material generation.
//!
//! The [`SupportGenerator`] takes the sliced layers of one object and
//! produces the scaffolding printed under its overhangs:
//!
//! 1. Contact areas under every overhang ([`contact`])
//! 2. Object top surfaces the support will rest on
//! 3. The Z of every support layer ([`layers_z`])
//! 4. Interface, bottom interface and base regions ([`interface`])
//! 5. Optional pillar shaping ([`pillars`])
//! 6. Extrusion paths for each layer ([`toolpaths`])
//!
//! Layer data is only read; contact and top detection run in parallel,
//! the vertical sweeps run top-down in sequence. A cancellation flag is
//! polled between stages and inside the sweeps.

mod contact;
mod interface;
mod layer;
mod layers_z;
mod pillars;
mod toolpaths;

pub use layer::SupportLayer;
pub use toolpaths::{SupportToolpath, ToolpathRole};

use crate::clipper::union_ex;
use crate::config::{PrintConfig, PrintObjectConfig, SupportPattern};
use crate::flow::{
    support_material_1st_layer_flow, support_material_flow, support_material_interface_flow, Flow,
};
use crate::geometry::ExPolygons;
use crate::slice::{Layer, SurfaceType};
use crate::{CoordF, Error, Result, EPSILON};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Distance (mm) contact areas extend beyond the overhang they support.
pub const MARGIN: CoordF = 1.5;

/// Increment (mm) in which the contact margin is grown.
pub const MARGIN_STEP: CoordF = MARGIN;

/// Side of a support pillar (mm).
pub const PILLAR_SIZE: CoordF = 2.5;

/// Distance (mm) between pillar origins.
pub const PILLAR_SPACING: CoordF = 10.0;

/// Vertical distance between a supported layer's top and the top of its contact layer.
///
/// A configured distance of `0` means the support touches the object, so the
/// contact layer ends where the supported layer begins. Otherwise the
/// contact is lowered by a nozzle-thick bridge layer plus the gap.
pub fn contact_distance(
    config: &PrintObjectConfig,
    layer_height: CoordF,
    nozzle_diameter: CoordF,
) -> CoordF {
    let extra = config.support_material_contact_distance;
    if extra == 0.0 {
        layer_height
    } else {
        nozzle_diameter + extra
    }
}

/// Upper bound for the height of any support layer above the raft.
pub fn max_support_layer_height(print: &PrintConfig, object: &PrintObjectConfig) -> CoordF {
    object.support_material_max_layer_height_factor * print.nozzle_diameter
}

/// Top Z of the raft, or 0 without one.
pub fn raft_top(print: &PrintConfig, object: &PrintObjectConfig) -> CoordF {
    match object.raft_layers {
        0 => 0.0,
        n => {
            object.first_layer_height
                + (n - 1) as CoordF * max_support_layer_height(print, object)
        }
    }
}

/// Distance the object is lifted to sit on the raft.
///
/// Chosen so that the first object layer's contact Z is exactly the raft top.
pub fn object_lift(print: &PrintConfig, object: &PrintObjectConfig) -> CoordF {
    if object.raft_layers == 0 {
        return 0.0;
    }
    let h = object.layer_height;
    raft_top(print, object) + contact_distance(object, h, print.nozzle_diameter) - h
}

// ============================================================================
// Z-keyed regions
// ============================================================================

/// Regions keyed by Z, sorted ascending. Keys closer than [`EPSILON`] merge.
#[derive(Debug, Clone, Default)]
pub(crate) struct ZRegions {
    entries: Vec<(CoordF, ExPolygons)>,
}

impl ZRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, z: CoordF, regions: ExPolygons) {
        if regions.is_empty() {
            return;
        }
        match self.position(z) {
            Ok(i) => {
                let entry = &mut self.entries[i].1;
                entry.extend(regions);
                *entry = union_ex(entry);
            }
            Err(i) => self.entries.insert(i, (z, regions)),
        }
    }

    fn position(&self, z: CoordF) -> std::result::Result<usize, usize> {
        let i = self.entries.partition_point(|(k, _)| *k < z - EPSILON);
        match self.entries.get(i) {
            Some((k, _)) if (k - z).abs() < EPSILON => Ok(i),
            _ => Err(i),
        }
    }

    pub fn get(&self, z: CoordF) -> Option<&ExPolygons> {
        self.position(z).ok().map(|i| &self.entries[i].1)
    }

    /// Regions whose Z lies in `(z_min, z_max]`.
    pub fn in_range(&self, z_min: CoordF, z_max: CoordF) -> impl Iterator<Item = &ExPolygons> {
        self.entries
            .iter()
            .filter(move |(z, _)| *z > z_min + EPSILON && *z <= z_max + EPSILON)
            .map(|(_, r)| r)
    }

    pub fn zs(&self) -> Vec<CoordF> {
        self.entries.iter().map(|(z, _)| *z).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoordF, &ExPolygons)> {
        self.entries.iter().map(|(z, r)| (*z, r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Support generator for one print object.
#[derive(Debug, Clone)]
pub struct SupportGenerator<'a> {
    print_config: &'a PrintConfig,
    object_config: &'a PrintObjectConfig,
    flow: Flow,
    first_layer_flow: Flow,
    interface_flow: Flow,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> SupportGenerator<'a> {
    /// Create a generator, deriving its flows from the configuration.
    pub fn new(print_config: &'a PrintConfig, object_config: &'a PrintObjectConfig) -> Result<Self> {
        let height = max_support_layer_height(print_config, object_config);
        let flow = support_material_flow(print_config, object_config, height)?;
        let first_layer_flow = support_material_1st_layer_flow(print_config, object_config)?;
        let interface_flow = support_material_interface_flow(print_config, object_config, height)?;
        Ok(Self::with_flows(
            print_config,
            object_config,
            flow,
            first_layer_flow,
            interface_flow,
        ))
    }

    /// Create a generator with explicit flows.
    pub fn with_flows(
        print_config: &'a PrintConfig,
        object_config: &'a PrintObjectConfig,
        flow: Flow,
        first_layer_flow: Flow,
        interface_flow: Flow,
    ) -> Self {
        Self {
            print_config,
            object_config,
            flow,
            first_layer_flow,
            interface_flow,
            cancel: None,
        }
    }

    /// Poll `cancel` while generating; once set, generation stops with
    /// [`Error::Cancelled`].
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn first_layer_flow(&self) -> &Flow {
        &self.first_layer_flow
    }

    pub fn interface_flow(&self) -> &Flow {
        &self.interface_flow
    }

    /// See [`contact_distance`].
    pub fn contact_distance(&self, layer_height: CoordF, nozzle_diameter: CoordF) -> CoordF {
        contact_distance(self.object_config, layer_height, nozzle_diameter)
    }

    pub fn max_support_layer_height(&self) -> CoordF {
        max_support_layer_height(self.print_config, self.object_config)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Generate the support layers of an object.
    ///
    /// `layers` must be ordered bottom-up. Returns an empty list when the
    /// object needs no support or no support is configured.
    pub fn generate(&self, layers: &[Layer]) -> Result<Vec<SupportLayer>> {
        if !self.object_config.has_support_material() || layers.is_empty() {
            return Ok(Vec::new());
        }

        let contact = self.contact_area(layers)?;
        debug!("contact areas: {}", contact.len());
        self.check_cancelled()?;

        let top = self.object_top(layers, &contact)?;
        debug!("object top surfaces: {}", top.len());
        self.check_cancelled()?;

        let support_z = self.support_layers_z(&contact.zs(), &top.zs(), layers);
        if support_z.is_empty() {
            info!("support layers: 0");
            return Ok(Vec::new());
        }

        let shape = match self.object_config.support_material_pattern {
            SupportPattern::Pillars => self.generate_pillars_shape(&contact, &support_z)?,
            _ => Vec::new(),
        };
        self.check_cancelled()?;

        // contacts are looked up per support layer from here on
        let mut contact_layers: Vec<ExPolygons> = support_z
            .iter()
            .map(|&z| contact.get(z).cloned().unwrap_or_default())
            .collect();

        let mut interface = self.generate_interface_layers(&support_z, &contact, &top)?;
        self.clip_with_object(&mut contact_layers, &support_z, layers)?;
        self.clip_with_object(&mut interface, &support_z, layers)?;
        if !shape.is_empty() {
            self.clip_with_shape(&mut interface, &shape);
        }

        let mut base = self.generate_base_layers(&support_z, &contact, &interface, &top)?;
        self.clip_with_object(&mut base, &support_z, layers)?;
        if !shape.is_empty() {
            self.clip_with_shape(&mut base, &shape);
        }

        self.generate_bottom_interface_layers(&support_z, &mut base, &top, &mut interface);
        self.check_cancelled()?;

        let raft_layers = self.object_config.raft_layers as usize;
        let mut support_layers = Vec::with_capacity(support_z.len());
        for (i, &z) in support_z.iter().enumerate() {
            let bottom = if i == 0 { 0.0 } else { support_z[i - 1] };
            let mut layer = SupportLayer::new(i, z, z - bottom, i < raft_layers);

            let base_type = if !shape.is_empty() && i > 0 && i >= raft_layers {
                SurfaceType::SupportPillar
            } else {
                SurfaceType::SupportBase
            };
            layer
                .support_regions
                .append_expolygons(std::mem::take(&mut base[i]), base_type);
            layer
                .support_regions
                .append_expolygons(std::mem::take(&mut interface[i]), SurfaceType::SupportInterface);
            layer.contact = std::mem::take(&mut contact_layers[i]);
            support_layers.push(layer);
        }

        self.generate_toolpaths(&mut support_layers)?;

        info!(
            "support layers: {} ({} raft)",
            support_layers.len(),
            raft_layers.min(support_layers.len())
        );
        Ok(support_layers)
    }
}
