//! Configuration module.
//!
//! - [`PrintConfig`] - Printer-wide settings
//! - [`PrintObjectConfig`] - Per-object layering and support settings

mod print_config;

pub use print_config::{PrintConfig, PrintObjectConfig, SupportPattern};
