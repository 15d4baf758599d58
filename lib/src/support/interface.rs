//! Interface, base and object clearance passes.
//!
//! All passes work on one region list per support layer, indexed like the
//! support Z list.

use super::{SupportGenerator, ZRegions};
use crate::clipper::{difference, grow, intersection, union_ex};
use crate::geometry::ExPolygons;
use crate::slice::Layer;
use crate::{CoordF, Result, EPSILON};

/// Z range `(z_min, z_max]` covered by support layer `i`.
fn layer_range(support_z: &[CoordF], i: usize) -> (CoordF, CoordF) {
    let z_min = if i == 0 { 0.0 } else { support_z[i - 1] };
    (z_min, support_z[i])
}

/// Top and contact regions that fall within support layer `i`.
fn blockers(support_z: &[CoordF], i: usize, top: &ZRegions, contact: &ZRegions) -> ExPolygons {
    let (z_min, z_max) = layer_range(support_z, i);
    top.in_range(z_min, z_max)
        .chain(contact.in_range(z_min, z_max))
        .flat_map(|r| r.iter().cloned())
        .collect()
}

impl SupportGenerator<'_> {
    /// Indices of the object layers whose Z span overlaps support layer `i`.
    pub fn overlapping_layers(&self, i: usize, support_z: &[CoordF], layers: &[Layer]) -> Vec<usize> {
        let (z_min, z_max) = layer_range(support_z, i);
        layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.print_z > z_min + EPSILON && l.bottom_z() < z_max - EPSILON)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Project every contact down through the interface layers below it.
    ///
    /// The contact layer counts as the first interface layer.
    pub(crate) fn generate_interface_layers(
        &self,
        support_z: &[CoordF],
        contact: &ZRegions,
        top: &ZRegions,
    ) -> Result<Vec<ExPolygons>> {
        let num = self.object_config.support_material_interface_layers as usize;
        let mut interface: Vec<ExPolygons> = vec![Vec::new(); support_z.len()];

        for (layer_id, &z) in support_z.iter().enumerate() {
            let mut this = match contact.get(z) {
                Some(c) => c.clone(),
                None => continue,
            };
            self.check_cancelled()?;

            for i in (0..layer_id).rev().take(num.saturating_sub(1)) {
                let mut subject = this;
                subject.extend(interface[i].iter().cloned());
                let clip = union_ex(&blockers(support_z, i, top, contact));
                this = difference(&union_ex(&subject), &clip);
                interface[i] = this.clone();
            }
        }
        Ok(interface)
    }

    /// Fill everything under interfaces and contacts down to the bed or to
    /// the object top they rest on.
    pub(crate) fn generate_base_layers(
        &self,
        support_z: &[CoordF],
        contact: &ZRegions,
        interface: &[ExPolygons],
        top: &ZRegions,
    ) -> Result<Vec<ExPolygons>> {
        let single_interface = self.object_config.support_material_interface_layers <= 1;
        let mut base: Vec<ExPolygons> = vec![Vec::new(); support_z.len()];

        for i in (0..support_z.len().saturating_sub(1)).rev() {
            self.check_cancelled()?;

            let mut subject: ExPolygons = base[i + 1].clone();
            subject.extend(interface[i + 1].iter().cloned());
            // without interface layers the contact itself must be carried down
            if single_interface {
                if let Some(upper_contact) = contact.get(support_z[i + 1]) {
                    subject.extend(upper_contact.iter().cloned());
                }
            }
            if subject.is_empty() {
                continue;
            }

            let mut clip = blockers(support_z, i, top, contact);
            clip.extend(interface[i].iter().cloned());
            base[i] = difference(&union_ex(&subject), &union_ex(&clip));
        }
        Ok(base)
    }

    /// Turn the base right above each object top (and above the raft) into
    /// interface, for a dense surface where support meets the object.
    pub(crate) fn generate_bottom_interface_layers(
        &self,
        support_z: &[CoordF],
        base: &mut [ExPolygons],
        top: &ZRegions,
        interface: &mut [ExPolygons],
    ) {
        let num = self.object_config.support_material_interface_layers as usize;
        if num == 0 {
            return;
        }

        let spacing = self.interface_flow.spacing();
        let area_threshold = spacing * spacing;

        for (top_z, this) in top.iter() {
            let above = support_z
                .iter()
                .enumerate()
                .filter(|(_, &z)| z > top_z + EPSILON)
                .map(|(i, _)| i)
                .take(num);
            for layer_id in above {
                if base[layer_id].is_empty() {
                    continue;
                }
                let area: ExPolygons = intersection(&base[layer_id], this)
                    .into_iter()
                    .filter(|ex| ex.area_mm2() >= area_threshold)
                    .collect();
                if area.is_empty() {
                    continue;
                }
                base[layer_id] = difference(&base[layer_id], &area);
                interface[layer_id].extend(area);
                interface[layer_id] = union_ex(&interface[layer_id]);
            }
        }

        // the topmost raft layer carries the object
        let raft_layers = self.object_config.raft_layers as usize;
        if raft_layers > 0 && raft_layers <= base.len() {
            let raft_top = raft_layers - 1;
            let moved = std::mem::take(&mut base[raft_top]);
            if !moved.is_empty() {
                interface[raft_top].extend(moved);
                interface[raft_top] = union_ex(&interface[raft_top]);
            }
        }
    }

    /// Keep `support` away from the object.
    ///
    /// Each layer loses the slices of every overlapping object layer, grown
    /// by one support extrusion width plus the configured contact gap.
    pub(crate) fn clip_with_object(
        &self,
        support: &mut [ExPolygons],
        support_z: &[CoordF],
        layers: &[Layer],
    ) -> Result<()> {
        let clearance = self.flow.width + self.object_config.support_material_contact_distance;
        for i in 0..support.len() {
            if support[i].is_empty() {
                continue;
            }
            self.check_cancelled()?;

            let slices: ExPolygons = self
                .overlapping_layers(i, support_z, layers)
                .into_iter()
                .flat_map(|idx| layers[idx].slices.iter().cloned())
                .collect();
            if slices.is_empty() {
                continue;
            }
            support[i] = difference(&support[i], &grow(&union_ex(&slices), clearance));
        }
        Ok(())
    }
}
