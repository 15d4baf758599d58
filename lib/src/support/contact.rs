//! Contact areas and the object tops they land on.

use super::{SupportGenerator, ZRegions, MARGIN, MARGIN_STEP};
use crate::clipper::{difference, grow, intersection, opening, shrink, union_ex};
use crate::geometry::{ExPolygon, ExPolygons};
use crate::slice::{Layer, SurfaceType};
use crate::{CoordF, Result, EPSILON};
use rayon::prelude::*;

impl SupportGenerator<'_> {
    /// Overhang of `layer` over `lower`, before the contact margin is added.
    fn overhang(&self, layer_id: usize, layer: &Layer, lower: &Layer) -> ExPolygons {
        let config = self.object_config;
        let half_width = self.flow.width / 2.0;
        let enforced = layer_id < config.support_material_enforce_layers as usize;

        let diff = if enforced {
            difference(&layer.slices, &lower.slices)
        } else if config.support_material_threshold > 0.0 {
            let angle = (config.support_material_threshold + 1.0).to_radians();
            let d = lower.height * angle.cos() / angle.sin();
            let diff = difference(&shrink(&layer.slices, d), &lower.slices);
            difference(&diff, &grow(&lower.slices, half_width))
        } else {
            difference(&layer.slices, &grow(&lower.slices, half_width))
        };

        // collapse very tiny spots
        opening(&diff, self.flow.width / 10.0)
    }

    /// Contact region of one object layer, if it needs any.
    fn layer_contact(&self, layer_id: usize, layers: &[Layer]) -> ExPolygons {
        let config = self.object_config;
        let layer = &layers[layer_id];

        if layer_id == 0 {
            // raft footprint: contours only, for a continuous raft
            let contours: ExPolygons = layer
                .slices
                .iter()
                .map(|ex| ExPolygon::new(ex.contour.clone()))
                .collect();
            return grow(&union_ex(&contours), MARGIN);
        }

        let enforced = layer_id < config.support_material_enforce_layers as usize;
        if !config.support_material && !enforced {
            return Vec::new();
        }

        let lower = &layers[layer_id - 1];
        let mut contact = self.overhang(layer_id, layer, lower);
        if contact.is_empty() {
            // enforced layers are supported even where nothing overhangs
            if enforced {
                return union_ex(&layer.slices);
            }
            return contact;
        }

        // grow in steps so the contact does not spill over thin walls
        let slices_margin = grow(&lower.slices, self.flow.width / 2.0);
        let steps = (MARGIN / MARGIN_STEP).round().max(1.0) as usize;
        let increments = std::iter::once(self.flow.width / 2.0)
            .chain(std::iter::repeat(MARGIN_STEP).take(steps));
        for step in increments {
            contact = difference(&grow(&contact, step), &slices_margin);
        }
        contact
    }

    /// Detect the regions to support at each contact Z.
    pub(crate) fn contact_area(&self, layers: &[Layer]) -> Result<ZRegions> {
        let config = self.object_config;
        let nozzle = self.print_config.nozzle_diameter;

        let candidates: Vec<usize> = if config.raft_layers == 0 {
            (1..layers.len()).collect()
        } else if !config.support_material {
            // raft only, plus any enforced layers
            let enforced = config.support_material_enforce_layers as usize;
            (0..layers.len().min(enforced.max(1))).collect()
        } else {
            (0..layers.len()).collect()
        };

        // union of everything below each layer, for build-plate-only support
        let below: Vec<ExPolygons> = if config.support_material_buildplate_only {
            let mut acc: ExPolygons = Vec::new();
            let mut below = Vec::with_capacity(layers.len());
            for layer in layers {
                below.push(acc.clone());
                acc.extend(layer.slices.iter().cloned());
                acc = union_ex(&acc);
            }
            below
        } else {
            Vec::new()
        };

        let contacts: Vec<Option<(CoordF, ExPolygons)>> = candidates
            .par_iter()
            .map(|&layer_id| {
                self.check_cancelled()?;
                let mut contact = self.layer_contact(layer_id, layers);
                if let Some(below) = below.get(layer_id) {
                    contact = difference(&contact, below);
                }
                if contact.is_empty() {
                    return Ok(None);
                }

                let layer = &layers[layer_id];
                let contact_z = layer.print_z - self.contact_distance(layer.height, nozzle);
                if contact_z < config.first_layer_height - EPSILON {
                    return Ok(None);
                }
                Ok(Some((contact_z, contact)))
            })
            .collect::<Result<_>>()?;

        let mut regions = ZRegions::new();
        for (z, contact) in contacts.into_iter().flatten() {
            regions.insert(z, contact);
        }
        Ok(regions)
    }

    /// Find the object top surfaces that contacts project onto.
    ///
    /// Walking down from the highest layer, each contact is projected until
    /// it meets a top surface; the touched part is recorded (grown by the
    /// flow width) at that top's Z and stops projecting further down.
    pub(crate) fn object_top(&self, layers: &[Layer], contact: &ZRegions) -> Result<ZRegions> {
        let mut top = ZRegions::new();
        if self.object_config.support_material_buildplate_only || contact.is_empty() {
            return Ok(top);
        }

        let top_surfaces: Vec<ExPolygons> = layers
            .par_iter()
            .map(|layer| layer.surfaces.expolygons_of_type(SurfaceType::Top))
            .collect();

        let contact_zs = contact.zs();
        let mut projection: ExPolygons = Vec::new();
        let mut min_top: Option<CoordF> = None;

        for (layer, tops) in layers.iter().zip(&top_surfaces).rev() {
            self.check_cancelled()?;
            if tops.is_empty() {
                continue;
            }

            // contacts between this layer and the last top considered join the projection
            let upper = min_top.unwrap_or(CoordF::INFINITY);
            for &z in &contact_zs {
                if z > layer.print_z && z <= upper + EPSILON {
                    if let Some(regions) = contact.get(z) {
                        projection.extend(regions.iter().cloned());
                    }
                }
            }
            if projection.is_empty() {
                continue;
            }
            projection = union_ex(&projection);

            let touching = intersection(&projection, tops);
            if !touching.is_empty() {
                top.insert(layer.print_z, grow(&touching, self.flow.width));
                min_top = Some(layer.print_z);
                projection = difference(&projection, &touching);
            }
        }
        Ok(top)
    }
}
