//! Configuration structures for the scan_graph analysis pipeline.
//!
//! This module defines all tunable parameters for graph recovery,
//! organized into groups for zero-line detection, calibration, tracing
//! and statistics. Every value that used to be a fixed default lives here
//! and is passed explicitly to the stage that needs it.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use scan_graph::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("config.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), scan_graph::AnalysisError>(())
//! ```
//!
//! Missing sections and fields fall back to their defaults, so a file only
//! needs to list what it changes.
//!
//! # Configuration Sections
//!
//! - [`ZeroLineConfig`]: detector thresholds, weights and fallback row
//! - [`CalibrationConfig`]: anchor value and gridline search
//! - [`TraceConfig`]: color profile table and candidate selection
//! - [`StatisticsConfig`]: first-hit rule and value limit

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::ProfileTable;
use crate::constants::{calibration, statistics, thresholds, trace, zero_line};
use crate::detection::ZeroLineMethod;
use crate::{AnalysisError, Result};

/// Complete pipeline configuration for graph analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Zero-line detection configuration
    pub zero_line: ZeroLineConfig,

    /// Scale calibration configuration
    pub calibration: CalibrationConfig,

    /// Line tracing configuration
    pub trace: TraceConfig,

    /// Statistics extraction configuration
    pub statistics: StatisticsConfig,
}

/// Zero-line detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroLineConfig {
    /// Search window half-height as a fraction of image height
    pub search_half_height_ratio: f64,

    /// Detectors to run
    pub methods: Vec<ZeroLineMethod>,

    /// Maximum R/G/B spread of a neutral pixel
    pub neutral_tolerance: u8,

    /// Luminance band of the neutral line
    pub neutral_min: u8,
    pub neutral_max: u8,

    /// Row fraction required by the thick neutral-line detector
    pub thick_line_acceptance: f64,

    /// Vertical Sobel response counted as a strong edge
    pub edge_strength_threshold: f64,

    /// Row fraction of strong edges required by the horizontal-edge detector
    pub horizontal_edge_acceptance: f64,

    /// Minimum normalized edge density
    pub min_edge_density: f64,

    /// Minimum step in mean row luminance
    pub min_luma_step: f64,

    /// Per-method confidence weights
    pub weights: MethodWeights,

    /// Half-width of the sub-pixel refinement band in rows
    pub refine_half_band: usize,

    /// Row used when no detector fires; `None` makes that a hard error
    pub fallback_y: Option<f64>,

    /// Fused confidence below this is flagged as low confidence
    pub low_confidence_threshold: f64,

    /// Detector agreement below this is flagged as low confidence
    pub min_agreement: f64,
}

/// Confidence weight per zero-line detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodWeights {
    pub thick_neutral_line: f64,
    pub horizontal_edge: f64,
    pub edge_density: f64,
    pub intensity_gradient: f64,
}

/// Scale calibration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Value of the anchor gridline
    pub anchor_value: f64,

    /// Anchor row used when no gridline is found
    pub default_anchor_y: f64,

    /// Search for the anchor gridline instead of using the default row
    pub anchor_search: bool,

    /// Maximum distance of a detected gridline from the default row
    pub search_tolerance: f64,

    /// Row fraction of strong edges required for a gridline
    pub min_line_fraction: f64,

    /// Rows next to the zero line excluded from the search
    pub min_zero_gap: f64,

    /// Vertical Sobel response counted as a strong edge
    pub edge_strength_threshold: f64,
}

/// Line tracing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Color profiles by name
    pub profiles: ProfileTable,

    /// Profiles tried during auto-selection; empty tries every profile
    pub candidates: Vec<String>,

    /// Present columns required for a usable trace
    pub min_present_columns: usize,
}

/// Statistics extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Smallest one-column rise that counts as a first hit
    pub first_hit_min_rise: f64,

    /// Allowed drop on the column after the rise
    pub first_hit_rebound_tolerance: f64,

    /// The value before the rise must be below this
    pub first_hit_baseline_ceiling: f64,

    /// Columns scanned by the first-hit rule
    pub first_hit_window: usize,

    /// Fall back to trend-reversal detection over the whole series
    pub trend_fallback: bool,

    /// Columns in the trend-reversal slope window
    pub trend_window: usize,

    /// Symmetric clamp applied to converted values
    pub value_limit: Option<f64>,

    /// Present columns required before statistics are computed
    pub min_present_columns: usize,
}

impl Default for ZeroLineConfig {
    fn default() -> Self {
        Self {
            search_half_height_ratio: zero_line::SEARCH_HALF_HEIGHT_RATIO,
            methods: ZeroLineMethod::ALL.to_vec(),
            neutral_tolerance: zero_line::NEUTRAL_TOLERANCE,
            neutral_min: zero_line::NEUTRAL_MIN,
            neutral_max: zero_line::NEUTRAL_MAX,
            thick_line_acceptance: zero_line::THICK_LINE_ACCEPTANCE,
            edge_strength_threshold: zero_line::EDGE_STRENGTH_THRESHOLD,
            horizontal_edge_acceptance: zero_line::HORIZONTAL_EDGE_ACCEPTANCE,
            min_edge_density: zero_line::MIN_EDGE_DENSITY,
            min_luma_step: zero_line::MIN_LUMA_STEP,
            weights: MethodWeights::default(),
            refine_half_band: zero_line::REFINE_HALF_BAND,
            fallback_y: Some(zero_line::FALLBACK_Y),
            low_confidence_threshold: thresholds::LOW_CONFIDENCE_THRESHOLD,
            min_agreement: thresholds::MIN_AGREEMENT,
        }
    }
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            thick_neutral_line: zero_line::THICK_LINE_WEIGHT,
            horizontal_edge: zero_line::HORIZONTAL_EDGE_WEIGHT,
            edge_density: zero_line::EDGE_DENSITY_WEIGHT,
            intensity_gradient: zero_line::INTENSITY_GRADIENT_WEIGHT,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            anchor_value: calibration::ANCHOR_VALUE,
            default_anchor_y: calibration::DEFAULT_ANCHOR_Y,
            anchor_search: true,
            search_tolerance: calibration::ANCHOR_SEARCH_TOLERANCE,
            min_line_fraction: calibration::MIN_ANCHOR_LINE_FRACTION,
            min_zero_gap: calibration::MIN_ANCHOR_GAP,
            edge_strength_threshold: zero_line::EDGE_STRENGTH_THRESHOLD,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            profiles: ProfileTable::builtin(),
            candidates: Vec::new(),
            min_present_columns: trace::MIN_PRESENT_COLUMNS,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            first_hit_min_rise: statistics::FIRST_HIT_MIN_RISE,
            first_hit_rebound_tolerance: statistics::FIRST_HIT_REBOUND_TOLERANCE,
            first_hit_baseline_ceiling: statistics::FIRST_HIT_BASELINE_CEILING,
            first_hit_window: statistics::FIRST_HIT_SCAN_WINDOW,
            trend_fallback: false,
            trend_window: statistics::TREND_WINDOW,
            value_limit: None,
            min_present_columns: statistics::MIN_PRESENT_COLUMNS,
        }
    }
}

impl PipelineConfig {
    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AnalysisError::config("Invalid configuration JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::config(format!("Failed to read {}", path.display()), e))?;
        Self::from_json_str(&content)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json)
            .map_err(|e| AnalysisError::config(format!("Failed to write {}", path.display()), e))?;
        Ok(())
    }

    /// Check every value against its valid domain
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first offending field, or
    /// `UnknownProfile` for a candidate missing from the profile table
    pub fn validate(&self) -> Result<()> {
        let zl = &self.zero_line;
        let unit = |v: f64| (0.0..=1.0).contains(&v);

        if !(zl.search_half_height_ratio > 0.0 && zl.search_half_height_ratio <= 1.0) {
            return Err(AnalysisError::invalid_parameter(
                "zero_line.search_half_height_ratio",
                zl.search_half_height_ratio,
            ));
        }
        if zl.methods.is_empty() {
            return Err(AnalysisError::invalid_parameter("zero_line.methods", "[]"));
        }
        let unique: HashSet<_> = zl.methods.iter().collect();
        if unique.len() != zl.methods.len() {
            return Err(AnalysisError::invalid_parameter("zero_line.methods", "duplicate method"));
        }
        if zl.neutral_min > zl.neutral_max {
            return Err(AnalysisError::invalid_parameter(
                "zero_line.neutral_min",
                format!("{} > {}", zl.neutral_min, zl.neutral_max),
            ));
        }
        for (name, value) in [
            ("zero_line.thick_line_acceptance", zl.thick_line_acceptance),
            ("zero_line.horizontal_edge_acceptance", zl.horizontal_edge_acceptance),
            ("zero_line.min_edge_density", zl.min_edge_density),
            ("zero_line.low_confidence_threshold", zl.low_confidence_threshold),
            ("zero_line.min_agreement", zl.min_agreement),
            ("zero_line.weights.thick_neutral_line", zl.weights.thick_neutral_line),
            ("zero_line.weights.horizontal_edge", zl.weights.horizontal_edge),
            ("zero_line.weights.edge_density", zl.weights.edge_density),
            ("zero_line.weights.intensity_gradient", zl.weights.intensity_gradient),
            ("calibration.min_line_fraction", self.calibration.min_line_fraction),
        ] {
            if !unit(value) {
                return Err(AnalysisError::invalid_parameter(name, value));
            }
        }
        if let Some(y) = zl.fallback_y {
            if !y.is_finite() || y < 0.0 {
                return Err(AnalysisError::invalid_parameter("zero_line.fallback_y", y));
            }
        }

        let cal = &self.calibration;
        if !cal.anchor_value.is_finite() || cal.anchor_value <= 0.0 {
            return Err(AnalysisError::invalid_parameter("calibration.anchor_value", cal.anchor_value));
        }
        if !cal.default_anchor_y.is_finite() || cal.default_anchor_y < 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "calibration.default_anchor_y",
                cal.default_anchor_y,
            ));
        }

        for profile in self.trace.profiles.iter() {
            profile.validate()?;
        }
        self.trace.profiles.select(&self.trace.candidates)?;

        let st = &self.statistics;
        if let Some(limit) = st.value_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(AnalysisError::invalid_parameter("statistics.value_limit", limit));
            }
        }
        if st.first_hit_min_rise < 0.0 || st.first_hit_rebound_tolerance < 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "statistics.first_hit",
                format!("rise {} / tolerance {}", st.first_hit_min_rise, st.first_hit_rebound_tolerance),
            ));
        }

        Ok(())
    }
}
