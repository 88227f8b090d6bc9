//! Line detection module
//!
//! This module locates the zero reference line and traces the colored
//! graph line, both working from features computed once per image.

pub mod edges;
pub mod trace;
pub mod zero_line;

pub use edges::EdgeFeatures;
pub use trace::{LineTracer, ProfileTrace};
pub use zero_line::{
    DetectionHypothesis, EstimateSource, ZeroLineEstimate, ZeroLineLocator, ZeroLineMethod,
};
