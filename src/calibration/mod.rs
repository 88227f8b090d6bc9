//! Scale calibration module
//!
//! This module resolves the anchor gridline and builds the linear map from
//! graph rows to signed values.

pub mod scale;

pub use scale::{AnchorEstimate, AnchorPoint, AnchorSource, ScaleCalibration, ScaleCalibrator};
