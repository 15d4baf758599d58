//! Print driver.
//!
//! A [`Print`] owns the print-wide configuration and one [`PrintObject`]
//! per object. Each object slices its source into layers and owns the
//! support layers generated for it:
//!
//! source → layers (with surface types) → support layers
//!
//! # Example
//!
//! ```rust,ignore
//! use slicer_support::{LayerStack, Print, Prism};
//!
//! let mut print = Print::new();
//! print.default_object_config.set_deserialize("raft_layers", "2")?;
//! let stack = LayerStack::new(vec![Prism::cuboid([0.0; 3], [20.0, 20.0, 20.0])]);
//! let idx = print.add_object(Box::new(stack));
//! let object = print.get_object_mut(idx).unwrap();
//! object.generate_support_material()?;
//! assert_eq!(object.support_layer_count(), 2);
//! ```

use crate::config::{PrintConfig, PrintObjectConfig};
use crate::model::ModelObject;
use crate::slice::{classify_surfaces, generate_object_layers, Layer, LayerStack, Prism, SliceSource};
use crate::support::{object_lift, SupportGenerator, SupportLayer};
use crate::{CoordF, Error, Result};
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One object of a print, with its layers and support layers.
pub struct PrintObject {
    pub config: PrintObjectConfig,
    print_config: PrintConfig,
    layers: Vec<Layer>,
    support_layers: Vec<SupportLayer>,
    source: Box<dyn SliceSource>,
    cancel: Arc<AtomicBool>,
}

impl fmt::Debug for PrintObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintObject")
            .field("config", &self.config)
            .field("layers", &self.layers.len())
            .field("support_layers", &self.support_layers.len())
            .field("height", &self.source.height())
            .finish()
    }
}

impl PrintObject {
    fn new(source: Box<dyn SliceSource>, config: PrintObjectConfig, print_config: PrintConfig) -> Self {
        Self {
            config,
            print_config,
            layers: Vec::new(),
            support_layers: Vec::new(),
            source,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn support_layers(&self) -> &[SupportLayer] {
        &self.support_layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn support_layer_count(&self) -> usize {
        self.support_layers.len()
    }

    /// Height of the unlifted object (mm).
    pub fn height(&self) -> CoordF {
        self.source.height()
    }

    /// Flag that stops a running support generation once set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Slice the source into layers and classify their surfaces.
    ///
    /// With a raft, every layer is `layer_height` thick and the object is
    /// lifted to rest on the raft.
    pub fn slice(&mut self) -> Result<()> {
        self.config.validate()?;
        self.layers.clear();
        self.support_layers.clear();

        let layer_height = self.config.layer_height;
        let first_layer_height = if self.config.raft_layers > 0 {
            layer_height
        } else {
            self.config.first_layer_height
        };
        let lift = object_lift(&self.print_config, &self.config);

        let zs = generate_object_layers(first_layer_height, layer_height, self.source.height());
        let slice_z: Vec<CoordF> = zs.iter().map(|&(z, h)| z - h / 2.0).collect();
        let sections = self.source.slice(&slice_z)?;
        if sections.len() != zs.len() {
            return Err(Error::Slicing(format!(
                "expected {} sections, got {}",
                zs.len(),
                sections.len()
            )));
        }

        self.layers = zs
            .into_iter()
            .zip(sections)
            .enumerate()
            .map(|(id, ((z, h), slices))| Layer::new(id, z + lift, h, slices))
            .collect();
        classify_surfaces(&mut self.layers);

        debug!(
            "sliced {} layers, lifted by {:.3}mm",
            self.layers.len(),
            lift
        );
        Ok(())
    }

    /// Generate support layers, slicing first when needed.
    ///
    /// On error or cancellation no support layers are kept.
    pub fn generate_support_material(&mut self) -> Result<()> {
        if self.layers.is_empty() {
            self.slice()?;
        }
        self.support_layers.clear();

        let generator = SupportGenerator::new(&self.print_config, &self.config)?
            .with_cancel(Arc::clone(&self.cancel));
        self.support_layers = generator.generate(&self.layers)?;
        Ok(())
    }

    /// Drop generated support layers and clear a pending cancellation.
    pub fn invalidate_support(&mut self) {
        self.support_layers.clear();
        self.cancel.store(false, Ordering::Relaxed);
    }

    fn invalidate(&mut self) {
        self.layers.clear();
        self.invalidate_support();
    }
}

/// A print job: shared configuration and the objects to print.
#[derive(Debug, Default)]
pub struct Print {
    pub config: PrintConfig,
    /// Configuration given to every object added from now on.
    pub default_object_config: PrintObjectConfig,
    objects: Vec<PrintObject>,
}

impl Print {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PrintConfig, default_object_config: PrintObjectConfig) -> Self {
        Self {
            config,
            default_object_config,
            objects: Vec::new(),
        }
    }

    /// Add an object sliced from `source`; returns its index.
    pub fn add_object(&mut self, source: Box<dyn SliceSource>) -> usize {
        let object = PrintObject::new(
            source,
            self.default_object_config.clone(),
            self.config.clone(),
        );
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Add a model object, approximated by the bounding prisms of its
    /// volumes and placed on the bed.
    ///
    /// Object settings override the defaults; settings that are not object
    /// settings are ignored.
    pub fn add_model_object(&mut self, model_object: &ModelObject) -> Result<usize> {
        let boxes: Vec<_> = model_object
            .volumes
            .iter()
            .filter(|v| !v.modifier)
            .filter_map(|v| v.mesh.bounding_box())
            .collect();
        let z_min = boxes
            .iter()
            .map(|bb| bb.min[2])
            .reduce(CoordF::min)
            .ok_or_else(|| {
                Error::Geometry(format!("object '{}' has no geometry", model_object.name))
            })?;

        let prisms = boxes
            .iter()
            .map(|bb| {
                let mut min = bb.min;
                let mut max = bb.max;
                min[2] -= z_min;
                max[2] -= z_min;
                Prism::cuboid(min, max)
            })
            .collect();

        let mut config = self.default_object_config.clone();
        for (key, value) in &model_object.config {
            if PrintObjectConfig::has(key) {
                config.set_deserialize(key, value)?;
            } else {
                warn!("object '{}': ignoring setting '{}'", model_object.name, key);
            }
        }

        let object = PrintObject::new(Box::new(LayerStack::new(prisms)), config, self.config.clone());
        self.objects.push(object);
        Ok(self.objects.len() - 1)
    }

    pub fn get_object(&self, idx: usize) -> Option<&PrintObject> {
        self.objects.get(idx)
    }

    pub fn get_object_mut(&mut self, idx: usize) -> Option<&mut PrintObject> {
        self.objects.get_mut(idx)
    }

    pub fn objects(&self) -> &[PrintObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Reapply the current configuration to an object and drop everything
    /// derived from the old one.
    pub fn reload_object(&mut self, idx: usize) -> Result<()> {
        let config = self.default_object_config.clone();
        let print_config = self.config.clone();
        let object = self
            .objects
            .get_mut(idx)
            .ok_or_else(|| Error::Config(format!("no object at index {}", idx)))?;
        object.config = config;
        object.print_config = print_config;
        object.invalidate();
        Ok(())
    }

    /// Generate support material for every object.
    pub fn generate_support_material(&mut self) -> Result<()> {
        self.config.validate()?;
        for object in &mut self.objects {
            object.generate_support_material()?;
        }
        info!(
            "support generated for {} objects, {} layers total",
            self.objects.len(),
            self.objects.iter().map(PrintObject::support_layer_count).sum::<usize>()
        );
        Ok(())
    }
}
