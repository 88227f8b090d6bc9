//! Pixel-to-value scale calibration
//!
//! Maps graph rows to signed values using the zero line and one anchor row of
//! known value (normally the +30,000 gridline near the top of the graph).
//! Upward on the display is positive.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CalibrationConfig;
use crate::detection::edges::{band_centroid, EdgeFeatures};
use crate::{AnalysisError, Result};

/// Half-width of the band used to center a detected gridline
const ANCHOR_REFINE_HALF_BAND: usize = 3;

/// Row with a known value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub y: f64,
    pub value: f64,
}

/// Where the anchor row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    Manual,
    Detected,
    Default,
}

/// Anchor row with provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorEstimate {
    pub point: AnchorPoint,
    pub source: AnchorSource,
}

/// Linear row-to-value map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleCalibration {
    pub zero_y: f64,
    pub anchor_y: f64,
    pub anchor_value: f64,
    pub units_per_pixel: f64,
}

impl ScaleCalibration {
    /// Build a calibration from the zero line and one anchor
    ///
    /// `units_per_pixel = anchor_value / |zero_y - anchor_y|`. Rows above the
    /// zero line are positive, so an anchor drawn below it reads back as
    /// `-anchor_value`.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateCalibration` if the anchor lies on the zero line,
    /// the anchor value is zero, any input is not finite, or the resulting
    /// scale is not strictly positive
    pub fn new(zero_y: f64, anchor_y: f64, anchor_value: f64) -> Result<Self> {
        let degenerate = || AnalysisError::DegenerateCalibration {
            zero_y,
            anchor_y,
            anchor_value,
        };

        if !(zero_y.is_finite() && anchor_y.is_finite() && anchor_value.is_finite()) {
            return Err(degenerate());
        }
        if anchor_y == zero_y || anchor_value == 0.0 {
            return Err(degenerate());
        }

        let units_per_pixel = anchor_value / (zero_y - anchor_y).abs();
        if !units_per_pixel.is_finite() || units_per_pixel <= 0.0 {
            return Err(degenerate());
        }

        Ok(Self {
            zero_y,
            anchor_y,
            anchor_value,
            units_per_pixel,
        })
    }

    /// Build a calibration from a `+value` row above and a `-value` row below
    /// the zero line, averaging both distances
    ///
    /// # Errors
    ///
    /// Returns `DegenerateCalibration` unless `upper_y < zero_y < lower_y`
    /// and `value > 0`
    pub fn from_symmetric_anchors(zero_y: f64, upper_y: f64, lower_y: f64, value: f64) -> Result<Self> {
        let above = zero_y - upper_y;
        let below = lower_y - zero_y;
        if !(above > 0.0 && below > 0.0) {
            return Err(AnalysisError::DegenerateCalibration {
                zero_y,
                anchor_y: if above > 0.0 { lower_y } else { upper_y },
                anchor_value: value,
            });
        }

        let distance = (above + below) / 2.0;
        Self::new(zero_y, zero_y - distance, value)
    }

    /// Value at a (sub-pixel) row
    pub fn value_at(&self, y: f64) -> f64 {
        (self.zero_y - y) * self.units_per_pixel
    }

    /// Row showing `value`; inverse of [`value_at`](Self::value_at)
    pub fn pixel_at(&self, value: f64) -> f64 {
        self.zero_y - value / self.units_per_pixel
    }
}

/// Anchor resolution and calibration
#[derive(Debug, Clone, Default)]
pub struct ScaleCalibrator {
    config: CalibrationConfig,
}

impl ScaleCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Pick the anchor: manual override, detected gridline, or configured default
    pub fn resolve_anchor(
        &self,
        manual: Option<AnchorPoint>,
        features: &EdgeFeatures,
        zero_y: f64,
    ) -> AnchorEstimate {
        if let Some(point) = manual {
            return AnchorEstimate {
                point,
                source: AnchorSource::Manual,
            };
        }

        let detected = if self.config.anchor_search {
            self.detect_anchor_row(features, zero_y)
        } else {
            None
        };

        match detected {
            Some(y) => {
                debug!(y, "anchor gridline detected");
                AnchorEstimate {
                    point: AnchorPoint {
                        y,
                        value: self.config.anchor_value,
                    },
                    source: AnchorSource::Detected,
                }
            }
            None => {
                if self.config.anchor_search {
                    warn!(y = self.config.default_anchor_y, "anchor gridline not found, using default row");
                }
                AnchorEstimate {
                    point: AnchorPoint {
                        y: self.config.default_anchor_y,
                        value: self.config.anchor_value,
                    },
                    source: AnchorSource::Default,
                }
            }
        }
    }

    /// Find the gridline closest to the default anchor row
    ///
    /// Only rows at least `min_zero_gap` above the zero line and within
    /// `search_tolerance` of the default row are considered.
    pub fn detect_anchor_row(&self, features: &EdgeFeatures, zero_y: f64) -> Option<f64> {
        let cfg = &self.config;
        let limit = zero_y - cfg.min_zero_gap;
        if limit < 0.0 {
            return None;
        }

        let fraction = features.strong_edge_fraction(cfg.edge_strength_threshold);
        let last = (limit.floor() as usize).min(fraction.len().checked_sub(1)?);

        let best = (0..=last)
            .filter(|&y| fraction[y] >= cfg.min_line_fraction)
            .filter(|&y| (y as f64 - cfg.default_anchor_y).abs() <= cfg.search_tolerance)
            .min_by(|&a, &b| {
                let da = (a as f64 - cfg.default_anchor_y).abs();
                let db = (b as f64 - cfg.default_anchor_y).abs();
                da.total_cmp(&db).then(fraction[b].total_cmp(&fraction[a]))
            })?;

        let y = band_centroid(&fraction, best, ANCHOR_REFINE_HALF_BAND);
        (y <= limit).then_some(y)
    }

    /// Calibrate from a zero row and a resolved anchor
    pub fn calibrate(&self, zero_y: f64, anchor: &AnchorEstimate) -> Result<ScaleCalibration> {
        ScaleCalibration::new(zero_y, anchor.point.y, anchor.point.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use image::{Rgb, RgbImage};

    #[test]
    fn test_reference_calibration() {
        let cal = ScaleCalibration::new(250.0, 4.0, 30000.0).unwrap();
        assert_relative_eq!(cal.units_per_pixel, 30000.0 / 246.0);
        assert_abs_diff_eq!(cal.units_per_pixel, 121.95, epsilon = 0.01);
        assert_abs_diff_eq!(cal.value_at(125.0), 15243.9, epsilon = 1.0);
        assert_abs_diff_eq!(cal.value_at(250.0), 0.0);
        assert_abs_diff_eq!(cal.value_at(4.0), 30000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pixel_value_round_trip() {
        let cases = [(250.0, 4.0, 30000.0), (180.5, 20.25, 1000.0), (100.0, 160.0, 5000.0)];
        for (zero_y, anchor_y, value) in cases {
            let cal = ScaleCalibration::new(zero_y, anchor_y, value).unwrap();
            for y in [0.0, 17.3, zero_y, 311.9] {
                assert_relative_eq!(cal.pixel_at(cal.value_at(y)), y, epsilon = 1e-9, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_degenerate_anchor_on_zero_line() {
        let err = ScaleCalibration::new(250.0, 250.0, 30000.0).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateCalibration { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(ScaleCalibration::new(250.0, 4.0, 0.0).is_err());
        assert!(ScaleCalibration::new(f64::NAN, 4.0, 30000.0).is_err());
        assert!(ScaleCalibration::new(250.0, f64::INFINITY, 30000.0).is_err());
        // negative scale would flip the axis
        assert!(ScaleCalibration::new(250.0, 4.0, -30000.0).is_err());
    }

    #[test]
    fn test_anchor_below_zero_line() {
        let cal = ScaleCalibration::new(250.0, 496.0, 30000.0).unwrap();
        assert_relative_eq!(cal.units_per_pixel, 30000.0 / 246.0);
        assert_abs_diff_eq!(cal.value_at(496.0), -30000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cal.value_at(4.0), 30000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_symmetric_anchors() {
        let cal = ScaleCalibration::from_symmetric_anchors(250.0, 4.0, 498.0, 30000.0).unwrap();
        assert_relative_eq!(cal.units_per_pixel, 30000.0 / 247.0);
        assert_abs_diff_eq!(cal.value_at(3.0), 30000.0, epsilon = 1e-9);

        assert!(ScaleCalibration::from_symmetric_anchors(250.0, 300.0, 498.0, 30000.0).is_err());
    }

    fn gridline_image(zero_y: u32, anchor_y: Option<u32>) -> RgbImage {
        RgbImage::from_fn(120, 2 * zero_y, |_, y| {
            if y + 1 >= zero_y && y <= zero_y + 1 || Some(y) == anchor_y {
                Rgb([110, 110, 110])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_detects_anchor_gridline() {
        let image = gridline_image(250, Some(6));
        let features = EdgeFeatures::compute(&image);
        let calibrator = ScaleCalibrator::new();

        let anchor = calibrator.resolve_anchor(None, &features, 250.0);
        assert_eq!(anchor.source, AnchorSource::Detected);
        assert_abs_diff_eq!(anchor.point.y, 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(anchor.point.value, 30000.0);
    }

    #[test]
    fn test_missing_gridline_uses_default_row() {
        let image = gridline_image(250, None);
        let features = EdgeFeatures::compute(&image);
        let anchor = ScaleCalibrator::new().resolve_anchor(None, &features, 250.0);
        assert_eq!(anchor.source, AnchorSource::Default);
        assert_abs_diff_eq!(anchor.point.y, 4.0);
    }

    #[test]
    fn test_gridline_outside_tolerance_is_ignored() {
        let image = gridline_image(250, Some(60));
        let features = EdgeFeatures::compute(&image);
        assert_eq!(ScaleCalibrator::new().detect_anchor_row(&features, 250.0), None);
    }

    #[test]
    fn test_manual_anchor_wins() {
        let image = gridline_image(250, Some(6));
        let features = EdgeFeatures::compute(&image);
        let manual = AnchorPoint { y: 10.0, value: 25000.0 };
        let anchor = ScaleCalibrator::new().resolve_anchor(Some(manual), &features, 250.0);
        assert_eq!(anchor.source, AnchorSource::Manual);
        assert_eq!(anchor.point, manual);

        let cal = ScaleCalibrator::new().calibrate(250.0, &anchor).unwrap();
        assert_relative_eq!(cal.units_per_pixel, 25000.0 / 240.0);
    }
}
