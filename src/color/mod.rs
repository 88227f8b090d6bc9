//! Color conversion and line color profiles
//!
//! This module handles the RGB to HSV conversion shared by every detector
//! and the keyed table of per-color tracing parameters.

pub mod conversion;
pub mod profile;

pub use conversion::{ColorConverter, HsvImage, HsvPixel};
pub use profile::{ColorProfile, EdgeSensitivity, HueRange, ProfileTable, ScanDirection, UnitRange};
