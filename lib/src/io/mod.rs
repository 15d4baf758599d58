//! File formats.

pub mod tmf;
