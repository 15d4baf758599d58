//! Object layers and their surfaces.
//!
//! - [`Layer`] - One horizontal slice of an object
//! - [`Surface`] / [`SurfaceType`] - Typed regions of a layer
//! - [`SurfaceCollection`] - The set of surfaces of a layer, with filtering
//! - [`SliceSource`] / [`LayerStack`] - Where cross-sections come from

mod layer;
mod source;
mod surface;
mod surface_collection;

pub use layer::{classify_layer, classify_surfaces, generate_object_layers, Layer};
pub use source::{LayerStack, Prism, SliceSource};
pub use surface::{Surface, SurfaceType, SurfaceTypes, Surfaces};
pub use surface_collection::SurfaceCollection;
