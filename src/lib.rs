//! # Scan Graph
//!
//! A Rust crate for recovering the ball-count graph of a pinball score
//! display from a photograph or screenshot.
//!
//! This library turns a raster image into numbers by:
//! - Locating the zero reference line with several fused detectors
//! - Calibrating rows to values from the zero line and an anchor gridline
//! - Tracing the colored graph line column by column with per-color profiles
//! - Deriving maximum, minimum, current value and the first payout-like rise
//!
//! ## Example
//!
//! ```rust,no_run
//! use scan_graph::{GraphAnalyzer, ManualOverrides};
//! use std::path::Path;
//!
//! let analyzer = GraphAnalyzer::new();
//! let result = analyzer.analyze_file(Path::new("graph.png"), &ManualOverrides::none())?;
//! println!(
//!     "zero line {:.1} ({}), max {:.0}, current {:.0}",
//!     result.zero_line.y, result.profile, result.statistics.maximum, result.statistics.current
//! );
//! # Ok::<(), scan_graph::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod calibration;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod pipeline;
pub mod signal;

pub use calibration::{AnchorEstimate, AnchorPoint, AnchorSource, ScaleCalibration};
pub use color::{ColorProfile, ProfileTable};
pub use config::PipelineConfig;
pub use detection::{EstimateSource, ZeroLineEstimate, ZeroLineMethod};
pub use error::{AnalysisError, Result};
pub use pipeline::{GraphAnalyzer, ManualOverrides};
pub use signal::{Statistics, TracedSignal};

/// Complete analysis of one score-graph image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub width: u32,
    pub height: u32,
    /// Zero line with confidence, agreement and provenance
    pub zero_line: ZeroLineEstimate,
    /// Anchor row used for calibration
    pub anchor: AnchorEstimate,
    pub calibration: ScaleCalibration,
    /// Name of the color profile that produced the trace
    pub profile: String,
    /// Traced row per column; `null` where the line was not found
    pub signal: TracedSignal,
    /// Calibrated value per column; `null` where the line was not found
    pub values: Vec<Option<f64>>,
    pub statistics: Statistics,
    /// Set when the zero line came from the fallback row or a weak detection
    pub low_confidence: bool,
}

impl GraphAnalysis {
    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalysisError::config("Failed to serialize analysis", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_analysis_serialization() {
        let calibration = ScaleCalibration::new(250.0, 4.0, 30000.0).unwrap();
        let result = GraphAnalysis {
            width: 3,
            height: 300,
            zero_line: ZeroLineEstimate::fallback(250.0),
            anchor: AnchorEstimate {
                point: AnchorPoint { y: 4.0, value: 30000.0 },
                source: AnchorSource::Default,
            },
            calibration,
            profile: "pink".to_string(),
            signal: TracedSignal::new(vec![Some(260.0), None, Some(240.0)]),
            values: vec![Some(calibration.value_at(260.0)), None, Some(calibration.value_at(240.0))],
            statistics: Statistics {
                maximum: calibration.value_at(240.0),
                max_column: Some(2),
                minimum: calibration.value_at(260.0),
                min_column: 0,
                current: calibration.value_at(240.0),
                current_column: 2,
                first_hit_index: None,
                first_hit_value: None,
                present_columns: 2,
            },
            low_confidence: true,
        };

        let json = result.to_json().unwrap();
        assert!(json.contains("\"source\": \"fallback\""));
        assert!(json.contains("null"));

        let deserialized: GraphAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(result, deserialized);
    }
}
