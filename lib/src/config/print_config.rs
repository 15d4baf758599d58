//! Print configuration types.
//!
//! [`PrintConfig`] holds printer-wide settings, [`PrintObjectConfig`] the
//! per-object settings that drive layer generation and support material.
//! Both can be built in code, loaded from JSON, or patched key by key with
//! `set_deserialize` using the same option names as the configuration files.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Value parsing
// ============================================================================

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value '{}' for '{}'", value, key)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::Config(format!(
            "invalid boolean '{}' for '{}'",
            value, key
        ))),
    }
}

fn unknown_key(key: &str) -> Error {
    Error::Config(format!("unknown option '{}'", key))
}

// ============================================================================
// PrintConfig
// ============================================================================

/// Printer-wide configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Nozzle diameter (mm).
    pub nozzle_diameter: CoordF,
    /// Flow multiplier applied to bridge extrusions.
    pub bridge_flow_ratio: CoordF,
    /// First layer extrusion width (mm), 0 = auto.
    pub first_layer_extrusion_width: CoordF,
}

impl PrintConfig {
    /// Create a new PrintConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set nozzle diameter.
    pub fn nozzle_diameter(mut self, diameter: CoordF) -> Self {
        self.nozzle_diameter = diameter;
        self
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Set an option from its textual value.
    pub fn set_deserialize(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "nozzle_diameter" => self.nozzle_diameter = parse_value(key, value)?,
            "bridge_flow_ratio" => self.bridge_flow_ratio = parse_value(key, value)?,
            "first_layer_extrusion_width" => {
                self.first_layer_extrusion_width = parse_value(key, value)?
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Textual value of an option, `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        Some(match key {
            "nozzle_diameter" => self.nozzle_diameter.to_string(),
            "bridge_flow_ratio" => self.bridge_flow_ratio.to_string(),
            "first_layer_extrusion_width" => self.first_layer_extrusion_width.to_string(),
            _ => return None,
        })
    }

    pub fn has(key: &str) -> bool {
        Self::default().get(key).is_some()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.nozzle_diameter <= 0.0 {
            return Err(Error::Config("Nozzle diameter must be positive".into()));
        }
        if self.bridge_flow_ratio <= 0.0 {
            return Err(Error::Config("Bridge flow ratio must be positive".into()));
        }
        if self.first_layer_extrusion_width < 0.0 {
            return Err(Error::Config(
                "First layer extrusion width must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            nozzle_diameter: 0.5,
            bridge_flow_ratio: 1.0,
            first_layer_extrusion_width: 0.0,
        }
    }
}

impl fmt::Display for PrintConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PrintConfig:")?;
        writeln!(f, "  nozzle_diameter: {:.2}mm", self.nozzle_diameter)?;
        writeln!(f, "  bridge_flow_ratio: {:.2}", self.bridge_flow_ratio)?;
        write!(
            f,
            "  first_layer_extrusion_width: {:.2}mm",
            self.first_layer_extrusion_width
        )
    }
}

// ============================================================================
// PrintObjectConfig
// ============================================================================

/// Per-object configuration: layering and support material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintObjectConfig {
    // === Layer Heights ===
    /// Default layer height (mm).
    pub layer_height: CoordF,
    /// First layer height (mm).
    pub first_layer_height: CoordF,

    // === Support ===
    /// Generate support material under overhangs.
    pub support_material: bool,
    /// Force support under this many bottom layers, whatever their overhang.
    pub support_material_enforce_layers: u32,
    /// Number of raft layers under the object.
    pub raft_layers: u32,
    /// Vertical gap between support and object (mm), 0 = no gap.
    pub support_material_contact_distance: CoordF,
    /// Overhang threshold (degrees from horizontal), 0 = auto.
    pub support_material_threshold: CoordF,
    /// Number of dense interface layers between support and object.
    pub support_material_interface_layers: u32,
    /// Spacing between support lines (mm).
    pub support_material_spacing: CoordF,
    /// Spacing between interface lines (mm), 0 = solid.
    pub support_material_interface_spacing: CoordF,
    /// Support pattern.
    pub support_material_pattern: SupportPattern,
    /// Support line angle (degrees).
    pub support_material_angle: CoordF,
    /// Support extrusion width (mm), 0 = auto.
    pub support_material_extrusion_width: CoordF,
    /// Maximum support layer height as a fraction of the nozzle diameter.
    pub support_material_max_layer_height_factor: CoordF,
    /// Only generate support resting on the build plate.
    pub support_material_buildplate_only: bool,
}

impl PrintObjectConfig {
    /// Create a new PrintObjectConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set layer height.
    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = height;
        self
    }

    /// Builder method: set first layer height.
    pub fn first_layer_height(mut self, height: CoordF) -> Self {
        self.first_layer_height = height;
        self
    }

    /// Builder method: enable/disable support.
    pub fn support(mut self, enabled: bool) -> Self {
        self.support_material = enabled;
        self
    }

    /// Builder method: set raft layer count.
    pub fn raft_layers(mut self, layers: u32) -> Self {
        self.raft_layers = layers;
        self
    }

    /// Builder method: set enforced support layer count.
    pub fn enforce_layers(mut self, layers: u32) -> Self {
        self.support_material_enforce_layers = layers;
        self
    }

    /// Builder method: set support pattern.
    pub fn support_pattern(mut self, pattern: SupportPattern) -> Self {
        self.support_material_pattern = pattern;
        self
    }

    /// Builder method: set contact distance.
    pub fn contact_distance(mut self, distance: CoordF) -> Self {
        self.support_material_contact_distance = distance;
        self
    }

    /// Whether any support structure (raft included) will be generated.
    pub fn has_support_material(&self) -> bool {
        self.support_material || self.raft_layers > 0 || self.support_material_enforce_layers > 0
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Set an option from its textual value.
    pub fn set_deserialize(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "layer_height" => self.layer_height = parse_value(key, value)?,
            "first_layer_height" => self.first_layer_height = parse_value(key, value)?,
            "support_material" => self.support_material = parse_bool(key, value)?,
            "support_material_enforce_layers" => {
                self.support_material_enforce_layers = parse_value(key, value)?
            }
            "raft_layers" => self.raft_layers = parse_value(key, value)?,
            "support_material_contact_distance" => {
                self.support_material_contact_distance = parse_value(key, value)?
            }
            "support_material_threshold" => {
                self.support_material_threshold = parse_value(key, value)?
            }
            "support_material_interface_layers" => {
                self.support_material_interface_layers = parse_value(key, value)?
            }
            "support_material_spacing" => self.support_material_spacing = parse_value(key, value)?,
            "support_material_interface_spacing" => {
                self.support_material_interface_spacing = parse_value(key, value)?
            }
            "support_material_pattern" => self.support_material_pattern = value.parse()?,
            "support_material_angle" => self.support_material_angle = parse_value(key, value)?,
            "support_material_extrusion_width" => {
                self.support_material_extrusion_width = parse_value(key, value)?
            }
            "support_material_max_layer_height_factor" => {
                self.support_material_max_layer_height_factor = parse_value(key, value)?
            }
            "support_material_buildplate_only" => {
                self.support_material_buildplate_only = parse_bool(key, value)?
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Textual value of an option, `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        Some(match key {
            "layer_height" => self.layer_height.to_string(),
            "first_layer_height" => self.first_layer_height.to_string(),
            "support_material" => flag(self.support_material),
            "support_material_enforce_layers" => self.support_material_enforce_layers.to_string(),
            "raft_layers" => self.raft_layers.to_string(),
            "support_material_contact_distance" => {
                self.support_material_contact_distance.to_string()
            }
            "support_material_threshold" => self.support_material_threshold.to_string(),
            "support_material_interface_layers" => {
                self.support_material_interface_layers.to_string()
            }
            "support_material_spacing" => self.support_material_spacing.to_string(),
            "support_material_interface_spacing" => {
                self.support_material_interface_spacing.to_string()
            }
            "support_material_pattern" => self.support_material_pattern.name().to_string(),
            "support_material_angle" => self.support_material_angle.to_string(),
            "support_material_extrusion_width" => {
                self.support_material_extrusion_width.to_string()
            }
            "support_material_max_layer_height_factor" => {
                self.support_material_max_layer_height_factor.to_string()
            }
            "support_material_buildplate_only" => flag(self.support_material_buildplate_only),
            _ => return None,
        })
    }

    pub fn has(key: &str) -> bool {
        Self::default().get(key).is_some()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.layer_height <= 0.0 {
            return Err(Error::Config("Layer height must be positive".into()));
        }
        if self.first_layer_height <= 0.0 {
            return Err(Error::Config("First layer height must be positive".into()));
        }
        if self.support_material_contact_distance < 0.0 {
            return Err(Error::Config(
                "Support contact distance must not be negative".into(),
            ));
        }
        if !(0.0..90.0).contains(&self.support_material_threshold) {
            return Err(Error::Config(
                "Support threshold must be within [0, 90) degrees".into(),
            ));
        }
        if self.support_material_spacing <= 0.0 {
            return Err(Error::Config("Support spacing must be positive".into()));
        }
        if self.support_material_interface_spacing < 0.0 {
            return Err(Error::Config(
                "Support interface spacing must not be negative".into(),
            ));
        }
        if self.support_material_extrusion_width < 0.0 {
            return Err(Error::Config(
                "Support extrusion width must not be negative".into(),
            ));
        }
        if self.support_material_max_layer_height_factor <= 0.0 {
            return Err(Error::Config(
                "Maximum support layer height factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PrintObjectConfig {
    fn default() -> Self {
        Self {
            layer_height: 0.3,
            first_layer_height: 0.35,
            support_material: false,
            support_material_enforce_layers: 0,
            raft_layers: 0,
            support_material_contact_distance: 0.2,
            support_material_threshold: 0.0,
            support_material_interface_layers: 3,
            support_material_spacing: 2.5,
            support_material_interface_spacing: 0.0,
            support_material_pattern: SupportPattern::Pillars,
            support_material_angle: 0.0,
            support_material_extrusion_width: 0.0,
            support_material_max_layer_height_factor: 0.8,
            support_material_buildplate_only: false,
        }
    }
}

impl fmt::Display for PrintObjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PrintObjectConfig:")?;
        writeln!(f, "  layer_height: {:.2}mm", self.layer_height)?;
        writeln!(f, "  first_layer_height: {:.2}mm", self.first_layer_height)?;
        writeln!(f, "  support_material: {}", self.support_material)?;
        writeln!(f, "  raft_layers: {}", self.raft_layers)?;
        writeln!(
            f,
            "  enforce_layers: {}",
            self.support_material_enforce_layers
        )?;
        writeln!(
            f,
            "  contact_distance: {:.2}mm",
            self.support_material_contact_distance
        )?;
        write!(f, "  pattern: {}", self.support_material_pattern)
    }
}

// ============================================================================
// SupportPattern
// ============================================================================

/// Fill pattern of the support body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportPattern {
    /// Parallel lines.
    Rectilinear,
    /// Parallel lines, crossed on alternate layers.
    RectilinearGrid,
    /// Discrete square columns with capitals under contacts.
    #[default]
    Pillars,
}

impl SupportPattern {
    pub fn name(&self) -> &'static str {
        match self {
            SupportPattern::Rectilinear => "rectilinear",
            SupportPattern::RectilinearGrid => "rectilinear-grid",
            SupportPattern::Pillars => "pillars",
        }
    }
}

impl FromStr for SupportPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "rectilinear" => Ok(SupportPattern::Rectilinear),
            "rectilinear-grid" => Ok(SupportPattern::RectilinearGrid),
            "pillars" => Ok(SupportPattern::Pillars),
            other => Err(Error::Config(format!("unknown support pattern '{}'", other))),
        }
    }
}

impl fmt::Display for SupportPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_config_default() {
        let config = PrintConfig::default();
        assert!((config.nozzle_diameter - 0.5).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_print_config_set_deserialize() {
        let mut config = PrintConfig::new();
        config.set_deserialize("nozzle_diameter", "0.4").unwrap();
        assert!((config.nozzle_diameter - 0.4).abs() < 1e-9);
        assert_eq!(config.get("nozzle_diameter").as_deref(), Some("0.4"));

        assert!(matches!(
            config.set_deserialize("nozzle_diameter", "wide"),
            Err(Error::Config(_))
        ));
        assert!(config.set_deserialize("bed_temperature", "60").is_err());
        assert!(PrintConfig::has("bridge_flow_ratio"));
        assert!(!PrintConfig::has("bed_temperature"));
    }

    #[test]
    fn test_print_config_validation() {
        let mut config = PrintConfig::default();
        config.nozzle_diameter = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_print_object_config_default() {
        let config = PrintObjectConfig::default();
        assert!(!config.support_material);
        assert_eq!(config.raft_layers, 0);
        assert!((config.first_layer_height - 0.35).abs() < 1e-9);
        assert!((config.support_material_max_layer_height_factor - 0.8).abs() < 1e-9);
        assert_eq!(config.support_material_pattern, SupportPattern::Pillars);
        assert!(!config.has_support_material());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_print_object_config_builder() {
        let config = PrintObjectConfig::new()
            .layer_height(0.2)
            .raft_layers(2)
            .support_pattern(SupportPattern::RectilinearGrid);
        assert!((config.layer_height - 0.2).abs() < 1e-9);
        assert!(config.has_support_material());
        assert_eq!(config.support_material_pattern, SupportPattern::RectilinearGrid);
    }

    #[test]
    fn test_print_object_config_set_deserialize() {
        let mut config = PrintObjectConfig::default();
        config.set_deserialize("support_material", "1").unwrap();
        config.set_deserialize("raft_layers", "3").unwrap();
        config.set_deserialize("first_layer_height", "0.4").unwrap();
        config
            .set_deserialize("support_material_pattern", "rectilinear")
            .unwrap();
        config
            .set_deserialize("support_material_buildplate_only", "true")
            .unwrap();

        assert!(config.support_material);
        assert_eq!(config.raft_layers, 3);
        assert!((config.first_layer_height - 0.4).abs() < 1e-9);
        assert_eq!(config.support_material_pattern, SupportPattern::Rectilinear);
        assert_eq!(config.get("support_material").as_deref(), Some("1"));
        assert_eq!(
            config.get("support_material_pattern").as_deref(),
            Some("rectilinear")
        );

        assert!(config.set_deserialize("support_material", "maybe").is_err());
        assert!(config.set_deserialize("raft_layers", "-1").is_err());
        assert!(config.set_deserialize("support_material_pattern", "honeycomb").is_err());
        assert!(config.get("fill_density").is_none());
    }

    #[test]
    fn test_print_object_config_validation() {
        let mut config = PrintObjectConfig::default();
        config.support_material_threshold = 95.0;
        assert!(config.validate().is_err());

        config.support_material_threshold = 45.0;
        config.layer_height = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_uses_defaults_for_missing_keys() {
        let config: PrintObjectConfig =
            serde_json::from_str(r#"{"raft_layers": 2, "support_material_pattern": "rectilinear-grid"}"#)
                .unwrap();
        assert_eq!(config.raft_layers, 2);
        assert_eq!(config.support_material_pattern, SupportPattern::RectilinearGrid);
        assert!((config.layer_height - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_support_pattern_names() {
        for p in [
            SupportPattern::Rectilinear,
            SupportPattern::RectilinearGrid,
            SupportPattern::Pillars,
        ] {
            assert_eq!(p.name().parse::<SupportPattern>().unwrap(), p);
        }
    }
}
