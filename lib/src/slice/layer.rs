//! Object layers and surface classification.
//!
//! A [`Layer`] holds one horizontal slice of a print object: its merged
//! outline (`slices`) and the typed surfaces derived from comparing that
//! outline with the layers directly above and below.

use super::surface::{Surface, SurfaceType};
use super::surface_collection::SurfaceCollection;
use crate::clipper::{difference, opening, union_ex};
use crate::geometry::{ExPolygon, ExPolygons};
use crate::{CoordF, EPSILON};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Regions thinner than this (mm) are not classified as top or bottom.
const CLASSIFY_OPENING: CoordF = 0.01;

/// A single layer of a print object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    /// Index of the layer within its object.
    pub id: usize,
    /// Height of the layer's top surface (mm).
    pub print_z: CoordF,
    /// Layer thickness (mm).
    pub height: CoordF,
    /// Merged outline of the object at this layer.
    pub slices: ExPolygons,
    /// Classified surfaces of this layer.
    pub surfaces: SurfaceCollection,
}

impl Layer {
    pub fn new(id: usize, print_z: CoordF, height: CoordF, slices: ExPolygons) -> Self {
        Self {
            id,
            print_z,
            height,
            slices,
            surfaces: SurfaceCollection::new(),
        }
    }

    /// Z at which this layer is cut: the middle of its thickness.
    #[inline]
    pub fn slice_z(&self) -> CoordF {
        self.print_z - self.height / 2.0
    }

    /// Z of the layer's bottom surface.
    #[inline]
    pub fn bottom_z(&self) -> CoordF {
        self.print_z - self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Compute `(print_z, height)` pairs for an object of `object_height` mm.
///
/// The first layer uses `first_layer_height`; the rest use `layer_height`.
/// The last layer is clipped to the object top when the remainder is
/// non-negligible, so no layer ends above the object.
pub fn generate_object_layers(
    first_layer_height: CoordF,
    layer_height: CoordF,
    object_height: CoordF,
) -> Vec<(CoordF, CoordF)> {
    let mut out = Vec::new();
    if object_height <= 0.0 || first_layer_height <= 0.0 || layer_height <= 0.0 {
        return out;
    }

    let mut z = first_layer_height.min(object_height);
    out.push((z, z));
    while z + EPSILON < object_height {
        let height = layer_height.min(object_height - z);
        if height < EPSILON {
            break;
        }
        z += height;
        out.push((z, height));
    }
    out
}

/// Classify the surfaces of one layer against its neighbours.
///
/// - **Top**: not covered by the layer above
/// - **Bottom**: on the bed (first layer)
/// - **BottomBridge**: not resting on the layer below
/// - **Internal**: everything else
pub fn classify_layer(
    current: &ExPolygons,
    lower: Option<&ExPolygons>,
    upper: Option<&ExPolygons>,
) -> SurfaceCollection {
    let mut surfaces = SurfaceCollection::new();
    if current.is_empty() {
        return surfaces;
    }

    let top = match upper {
        Some(upper) => opening(&difference(current, upper), CLASSIFY_OPENING),
        None => current.clone(),
    };

    let (bottom, bottom_type) = match lower {
        Some(lower) => (
            opening(&difference(current, lower), CLASSIFY_OPENING),
            SurfaceType::BottomBridge,
        ),
        None => (current.clone(), SurfaceType::Bottom),
    };

    // a region both top and bottom (one-layer membrane) is kept as bottom
    let top = difference(&top, &bottom);

    let mut classified: ExPolygons = top.clone();
    classified.extend(bottom.iter().cloned());
    let internal = difference(current, &union_ex(&classified));

    surfaces.append_expolygons(top, SurfaceType::Top);
    surfaces.append_surfaces(
        bottom
            .into_iter()
            .map(|ex: ExPolygon| match bottom_type {
                SurfaceType::BottomBridge => Surface::bridge(ex, None),
                t => Surface::new(ex, t),
            })
            .collect(),
    );
    surfaces.append_expolygons(internal, SurfaceType::Internal);
    surfaces
}

/// Classify the surfaces of every layer in parallel.
pub fn classify_surfaces(layers: &mut [Layer]) {
    let classified: Vec<SurfaceCollection> = (0..layers.len())
        .into_par_iter()
        .map(|i| {
            let lower = i.checked_sub(1).map(|j| &layers[j].slices);
            let upper = layers.get(i + 1).map(|l| &l.slices);
            let mut c = classify_layer(&layers[i].slices, lower, upper);
            for s in &mut c.surfaces {
                s.thickness = layers[i].height;
            }
            c
        })
        .collect();

    for (layer, surfaces) in layers.iter_mut().zip(classified) {
        layer.surfaces = surfaces;
    }
}
