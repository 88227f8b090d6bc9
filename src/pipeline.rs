//! Per-image analysis pipeline
//!
//! Sequences zero-line localization, scale calibration, line tracing and
//! statistics for one image, applying manual overrides and the configured
//! zero-line fallback. Tracing does not depend on calibration, so the two
//! branches run concurrently and meet at the statistics stage.

use std::path::{Path, PathBuf};

use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::{AnchorEstimate, AnchorPoint, ScaleCalibration, ScaleCalibrator};
use crate::color::HsvImage;
use crate::detection::{EdgeFeatures, LineTracer, ProfileTrace, ZeroLineEstimate, ZeroLineLocator};
use crate::image_loader::{load_image, validate_image};
use crate::signal::StatisticsExtractor;
use crate::{AnalysisError, GraphAnalysis, PipelineConfig, Result};

/// Caller-supplied values that bypass detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualOverrides {
    /// Zero-line row; skips the zero-line locator
    pub zero_y: Option<f64>,
    /// Anchor row and value; skips the gridline search
    ///
    /// The value is the gridline's magnitude and must be positive. Rows
    /// above the zero line read as positive, so a `+30000` anchor given on
    /// the `-30000` gridline below the zero line reads back as `-30000`.
    pub anchor: Option<AnchorPoint>,
    /// Color profile name; skips profile auto-selection
    pub profile: Option<String>,
}

impl ManualOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_zero_y(mut self, zero_y: f64) -> Self {
        self.zero_y = Some(zero_y);
        self
    }

    pub fn with_anchor(mut self, y: f64, value: f64) -> Self {
        self.anchor = Some(AnchorPoint { y, value });
        self
    }

    pub fn with_profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }
}

/// Score-graph analyzer
#[derive(Debug, Clone, Default)]
pub struct GraphAnalyzer {
    config: PipelineConfig,
}

impl GraphAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns the first validation error of `config`
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze one decoded image
    ///
    /// # Arguments
    ///
    /// * `image` - RGB8 raster, origin top-left
    /// * `overrides` - Manual zero line, anchor or profile
    ///
    /// # Returns
    ///
    /// A `GraphAnalysis` with zero line, calibration, traced signal and statistics
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if:
    /// - The image dimensions are unsupported
    /// - No zero-line detector fires and no fallback row is configured
    /// - The anchor and zero line give a degenerate calibration
    /// - No candidate profile traces enough columns
    /// - An override names an unknown profile or an invalid row
    pub fn analyze(&self, image: &RgbImage, overrides: &ManualOverrides) -> Result<GraphAnalysis> {
        // Step 1: Input validation
        validate_image(image)?;
        let (width, height) = image.dimensions();

        // Step 2: Zero line and calibration || line tracing
        let (calibrated, traced) = rayon::join(
            || self.calibrate(image, overrides),
            || self.trace(image, overrides),
        );
        let (zero_line, anchor, calibration) = calibrated?;
        let trace = traced?;

        // Step 3: Statistics
        let extractor = StatisticsExtractor::with_config(self.config.statistics.clone());
        let statistics = extractor.extract(&trace, &calibration)?;
        let values = extractor.values(&trace.signal, &calibration);

        info!(
            width,
            height,
            zero_y = zero_line.y,
            profile = %trace.profile,
            low_confidence = zero_line.low_confidence,
            "graph analyzed"
        );

        Ok(GraphAnalysis {
            width,
            height,
            low_confidence: zero_line.low_confidence,
            zero_line,
            anchor,
            calibration,
            profile: trace.profile,
            signal: trace.signal,
            values,
            statistics,
        })
    }

    /// Load and analyze an image file
    pub fn analyze_file(&self, path: &Path, overrides: &ManualOverrides) -> Result<GraphAnalysis> {
        let image = load_image(path)?;
        self.analyze(&image, overrides)
    }

    /// Analyze images in parallel; one result per input, in input order
    ///
    /// A failing image never aborts the batch.
    pub fn analyze_batch(&self, images: &[RgbImage], overrides: &ManualOverrides) -> Vec<Result<GraphAnalysis>> {
        images
            .par_iter()
            .enumerate()
            .map(|(index, image)| {
                self.analyze(image, overrides).inspect_err(|e| {
                    warn!(index, error = %e, "batch item failed");
                })
            })
            .collect()
    }

    /// Load and analyze files in parallel; one result per path, in input order
    pub fn analyze_paths(&self, paths: &[PathBuf], overrides: &ManualOverrides) -> Vec<Result<GraphAnalysis>> {
        paths
            .par_iter()
            .map(|path| {
                self.analyze_file(path, overrides).inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "batch item failed");
                })
            })
            .collect()
    }

    /// Resolve the zero line, then the anchor, then the calibration
    fn calibrate(
        &self,
        image: &RgbImage,
        overrides: &ManualOverrides,
    ) -> Result<(ZeroLineEstimate, AnchorEstimate, ScaleCalibration)> {
        let features = EdgeFeatures::compute(image);
        let zero_line = self.zero_line(image, &features, overrides.zero_y)?;

        let calibrator = ScaleCalibrator::with_config(self.config.calibration.clone());
        let anchor = calibrator.resolve_anchor(overrides.anchor, &features, zero_line.y);
        let calibration = calibrator.calibrate(zero_line.y, &anchor)?;

        Ok((zero_line, anchor, calibration))
    }

    fn zero_line(
        &self,
        image: &RgbImage,
        features: &EdgeFeatures,
        manual: Option<f64>,
    ) -> Result<ZeroLineEstimate> {
        if let Some(y) = manual {
            if !y.is_finite() || y < 0.0 || y >= f64::from(image.height()) {
                return Err(AnalysisError::invalid_parameter("overrides.zero_y", y));
            }
            return Ok(ZeroLineEstimate::manual(y));
        }

        let locator = ZeroLineLocator::with_config(self.config.zero_line.clone());
        match locator.locate_with_features(image, features) {
            Ok(estimate) => Ok(estimate),
            Err(AnalysisError::DetectionUnavailable { reason }) => match self.config.zero_line.fallback_y {
                Some(y) => {
                    warn!(y, %reason, "zero line unavailable, using fallback row");
                    Ok(ZeroLineEstimate::fallback(y))
                }
                None => Err(AnalysisError::DetectionUnavailable { reason }),
            },
            Err(e) => Err(e),
        }
    }

    fn trace(&self, image: &RgbImage, overrides: &ManualOverrides) -> Result<ProfileTrace> {
        let cfg = &self.config.trace;
        let hsv = HsvImage::from_rgb(image);
        let tracer = LineTracer::with_min_present(cfg.min_present_columns);

        match &overrides.profile {
            Some(name) => tracer.trace_profile(&hsv, cfg.profiles.get(name)?),
            None => {
                let candidates = cfg.profiles.select(&cfg.candidates)?;
                tracer.select(&hsv, &candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::AnchorSource;
    use crate::detection::EstimateSource;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    /// 300×240 graph: gray zero line at row 120, blue trace 20 rows above it
    fn simple_graph() -> RgbImage {
        RgbImage::from_fn(300, 240, |_, y| match y {
            119..=121 => Rgb([120, 120, 120]),
            98..=100 => Rgb([30, 60, 230]),
            _ => Rgb([0, 0, 0]),
        })
    }

    #[test]
    fn test_analyze_simple_graph() {
        let analysis = GraphAnalyzer::new().analyze(&simple_graph(), &ManualOverrides::none()).unwrap();

        assert_abs_diff_eq!(analysis.zero_line.y, 120.0, epsilon = 1.0);
        assert_eq!(analysis.zero_line.source, EstimateSource::Detected);
        assert_eq!(analysis.profile, "blue");
        assert_eq!(analysis.signal.len(), 300);
        assert_eq!(analysis.values.len(), 300);
        assert!(analysis.statistics.maximum > 0.0);
        assert!(!analysis.low_confidence);
    }

    #[test]
    fn test_manual_overrides_bypass_detection() {
        let overrides = ManualOverrides::none()
            .with_zero_y(120.0)
            .with_anchor(20.0, 30000.0)
            .with_profile("blue");
        let analysis = GraphAnalyzer::new().analyze(&simple_graph(), &overrides).unwrap();

        assert_eq!(analysis.zero_line.source, EstimateSource::Manual);
        assert_eq!(analysis.anchor.source, AnchorSource::Manual);
        assert_abs_diff_eq!(analysis.calibration.units_per_pixel, 300.0);
        // blue stroke starts at row 98, centered at 99
        assert_abs_diff_eq!(analysis.statistics.current, 21.0 * 300.0, epsilon = 1e-6);
    }

    #[test]
    fn test_blank_image_falls_back() {
        // a diagonal stroke has no horizontal structure for the detectors
        let mut image = RgbImage::from_pixel(200, 300, Rgb([0, 0, 0]));
        for x in 0..200 {
            image.put_pixel(x, 50 + x, Rgb([30, 60, 230]));
        }
        let analysis = GraphAnalyzer::new().analyze(&image, &ManualOverrides::none()).unwrap();
        assert_eq!(analysis.zero_line.source, EstimateSource::Fallback);
        assert!(analysis.low_confidence);
        assert_abs_diff_eq!(analysis.zero_line.y, 250.0);
    }

    #[test]
    fn test_no_fallback_propagates_unavailable() {
        let mut config = PipelineConfig::default();
        config.zero_line.fallback_y = None;
        let analyzer = GraphAnalyzer::with_config(config).unwrap();

        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let err = analyzer.analyze(&image, &ManualOverrides::none()).unwrap_err();
        assert!(matches!(err, AnalysisError::DetectionUnavailable { .. }));
    }

    #[test]
    fn test_anchor_below_zero_line_uses_magnitude() {
        // -30000 gridline drawn 60 rows below the zero line at 120
        let below = ManualOverrides::none()
            .with_zero_y(120.0)
            .with_anchor(180.0, 30000.0)
            .with_profile("blue");
        let analysis = GraphAnalyzer::new().analyze(&simple_graph(), &below).unwrap();
        assert_abs_diff_eq!(analysis.calibration.units_per_pixel, 500.0);
        assert_abs_diff_eq!(analysis.calibration.value_at(180.0), -30000.0);

        let signed = ManualOverrides::none()
            .with_zero_y(120.0)
            .with_anchor(180.0, -30000.0)
            .with_profile("blue");
        let err = GraphAnalyzer::new().analyze(&simple_graph(), &signed).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateCalibration { .. }));
    }

    #[test]
    fn test_unknown_profile_override() {
        let overrides = ManualOverrides::none().with_profile("magenta");
        let err = GraphAnalyzer::new().analyze(&simple_graph(), &overrides).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownProfile { .. }));
    }

    #[test]
    fn test_out_of_range_zero_override() {
        let overrides = ManualOverrides::none().with_zero_y(5000.0);
        let err = GraphAnalyzer::new().analyze(&simple_graph(), &overrides).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn test_tiny_image_is_incompatible() {
        let image = RgbImage::new(5, 5);
        let err = GraphAnalyzer::new().analyze(&image, &ManualOverrides::none()).unwrap_err();
        assert!(matches!(err, AnalysisError::IncompatibleImage { .. }));
    }
}
