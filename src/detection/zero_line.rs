//! Zero-line localization with multi-method fusion
//!
//! Four independent detectors look for the neutral horizontal reference line
//! inside a window centered on the image midpoint:
//!
//! 1. Thick neutral line: rows made almost entirely of mid-gray pixels
//! 2. Horizontal edge: rows with the highest fraction of strong vertical gradients
//! 3. Edge density: rows with the highest mean vertical gradient
//! 4. Intensity gradient: largest step in mean row luminance
//!
//! Each detector is a pure function of the image features returning an
//! optional hypothesis. Fusion is a confidence-weighted mean over whatever
//! fired; when nothing fires the estimate is unavailable and the caller
//! decides on a fallback.

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::ColorConverter;
use crate::config::ZeroLineConfig;
use crate::constants::zero_line::AGREEMENT_SPREAD_PX;
use crate::detection::edges::{band_centroid, peak_in_window, search_window, EdgeFeatures};
use crate::image_loader::validate_image;
use crate::{AnalysisError, Result};

/// Zero-line detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroLineMethod {
    ThickNeutralLine,
    HorizontalEdge,
    EdgeDensity,
    IntensityGradient,
}

impl ZeroLineMethod {
    /// Every method, most precise first
    pub const ALL: [ZeroLineMethod; 4] = [
        ZeroLineMethod::ThickNeutralLine,
        ZeroLineMethod::HorizontalEdge,
        ZeroLineMethod::EdgeDensity,
        ZeroLineMethod::IntensityGradient,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ZeroLineMethod::ThickNeutralLine => "thick_neutral_line",
            ZeroLineMethod::HorizontalEdge => "horizontal_edge",
            ZeroLineMethod::EdgeDensity => "edge_density",
            ZeroLineMethod::IntensityGradient => "intensity_gradient",
        }
    }
}

/// Single detector output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionHypothesis {
    /// Sub-pixel row of the line center
    pub y: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub method: ZeroLineMethod,
}

/// Where a zero-line estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Detected,
    Manual,
    Fallback,
}

/// Fused zero-line position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroLineEstimate {
    pub y: f64,
    /// Mean confidence of the contributing hypotheses
    pub confidence: f64,
    /// 1.0 when detectors agree, falling to 0.0 as their spread grows
    pub agreement: f64,
    pub hypotheses: Vec<DetectionHypothesis>,
    pub source: EstimateSource,
    pub low_confidence: bool,
}

impl ZeroLineEstimate {
    /// Fuse detector hypotheses into one estimate
    ///
    /// # Arguments
    ///
    /// * `hypotheses` - Detector outputs; entries with non-positive confidence are ignored
    /// * `low_confidence_threshold` - Fused confidence below this sets `low_confidence`
    /// * `min_agreement` - Agreement below this sets `low_confidence`
    ///
    /// `low_confidence` is also set when any hypothesis lies more than
    /// `AGREEMENT_SPREAD_PX` from the fused row, so a row between two
    /// competing lines is never reported as a clean detection.
    ///
    /// # Errors
    ///
    /// Returns `DetectionUnavailable` if no hypothesis contributes
    pub fn fuse(
        hypotheses: Vec<DetectionHypothesis>,
        low_confidence_threshold: f64,
        min_agreement: f64,
    ) -> Result<Self> {
        let hypotheses: Vec<DetectionHypothesis> = hypotheses
            .into_iter()
            .filter(|h| h.confidence > 0.0 && h.y.is_finite())
            .collect();

        if hypotheses.is_empty() {
            return Err(AnalysisError::DetectionUnavailable {
                reason: "no zero-line detector met its acceptance threshold".to_string(),
            });
        }

        let n = hypotheses.len() as f64;
        let total: f64 = hypotheses.iter().map(|h| h.confidence).sum();
        let y = hypotheses.iter().map(|h| h.y * h.confidence).sum::<f64>() / total;
        let confidence = (total / n).min(1.0);

        let agreement = if hypotheses.len() < 2 {
            1.0
        } else {
            let mean = hypotheses.iter().map(|h| h.y).sum::<f64>() / n;
            let variance = hypotheses.iter().map(|h| (h.y - mean).powi(2)).sum::<f64>() / n;
            (1.0 - variance.sqrt() / AGREEMENT_SPREAD_PX).max(0.0)
        };

        let split = hypotheses.iter().any(|h| (h.y - y).abs() > AGREEMENT_SPREAD_PX);
        if split {
            warn!(y, agreement, "zero-line detectors disagree");
        }

        Ok(Self {
            y,
            confidence,
            agreement,
            hypotheses,
            source: EstimateSource::Detected,
            low_confidence: confidence < low_confidence_threshold || agreement < min_agreement || split,
        })
    }

    /// Caller-supplied zero line
    pub fn manual(y: f64) -> Self {
        Self {
            y,
            confidence: 1.0,
            agreement: 1.0,
            hypotheses: Vec::new(),
            source: EstimateSource::Manual,
            low_confidence: false,
        }
    }

    /// Configured default row used when detection is unavailable
    pub fn fallback(y: f64) -> Self {
        Self {
            y,
            confidence: 0.0,
            agreement: 0.0,
            hypotheses: Vec::new(),
            source: EstimateSource::Fallback,
            low_confidence: true,
        }
    }
}

/// Multi-method zero-line locator
#[derive(Debug, Clone, Default)]
pub struct ZeroLineLocator {
    config: ZeroLineConfig,
}

impl ZeroLineLocator {
    /// Create a locator with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a locator with custom parameters
    pub fn with_config(config: ZeroLineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ZeroLineConfig {
        &self.config
    }

    /// Locate the zero line in an image
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleImage` for unsupported dimensions and
    /// `DetectionUnavailable` if every detector declines
    pub fn locate(&self, image: &RgbImage) -> Result<ZeroLineEstimate> {
        validate_image(image)?;
        let features = EdgeFeatures::compute(image);
        self.locate_with_features(image, &features)
    }

    /// Locate the zero line reusing precomputed edge features
    pub fn locate_with_features(&self, image: &RgbImage, features: &EdgeFeatures) -> Result<ZeroLineEstimate> {
        validate_image(image)?;
        let hypotheses = self.hypotheses(image, features);
        let cfg = &self.config;
        let estimate = ZeroLineEstimate::fuse(hypotheses, cfg.low_confidence_threshold, cfg.min_agreement)?;

        info!(
            y = estimate.y,
            confidence = estimate.confidence,
            agreement = estimate.agreement,
            detectors = estimate.hypotheses.len(),
            "zero line located"
        );
        Ok(estimate)
    }

    /// Run every enabled detector; detectors run concurrently
    pub fn hypotheses(&self, image: &RgbImage, features: &EdgeFeatures) -> Vec<DetectionHypothesis> {
        let window = search_window(image.height(), self.config.search_half_height_ratio);

        self.config
            .methods
            .par_iter()
            .filter_map(|&method| {
                let hypothesis = self.detect(method, image, features, window);
                match &hypothesis {
                    Some(h) => debug!(method = method.name(), y = h.y, confidence = h.confidence, "hypothesis"),
                    None => debug!(method = method.name(), "no hypothesis"),
                }
                hypothesis
            })
            .collect()
    }

    /// Run a single detector
    pub fn detect(
        &self,
        method: ZeroLineMethod,
        image: &RgbImage,
        features: &EdgeFeatures,
        window: (usize, usize),
    ) -> Option<DetectionHypothesis> {
        let center = f64::from(image.height()) / 2.0;
        let (y, confidence) = match method {
            ZeroLineMethod::ThickNeutralLine => self.thick_neutral_line(image, window, center)?,
            ZeroLineMethod::HorizontalEdge => self.horizontal_edge(features, window, center)?,
            ZeroLineMethod::EdgeDensity => self.edge_density(features, window, center)?,
            ZeroLineMethod::IntensityGradient => self.intensity_gradient(features, window, center)?,
        };

        Some(DetectionHypothesis {
            y,
            confidence: confidence.clamp(0.0, 1.0),
            method,
        })
    }

    fn thick_neutral_line(&self, image: &RgbImage, window: (usize, usize), center: f64) -> Option<(f64, f64)> {
        let converter = ColorConverter::new();
        let cfg = &self.config;
        let width = f64::from(image.width());
        let band = f64::from(cfg.neutral_min)..=f64::from(cfg.neutral_max);

        let score = |y: u32| {
            let matching = (0..image.width())
                .filter(|&x| {
                    let Rgb([r, g, b]) = *image.get_pixel(x, y);
                    converter.is_neutral(r, g, b, cfg.neutral_tolerance)
                        && band.contains(&f64::from(converter.luminance(r, g, b)))
                })
                .count();
            matching as f64 / width
        };

        // Group accepted rows into contiguous runs of (row, score)
        let mut runs: Vec<Vec<(usize, f64)>> = Vec::new();
        let mut current: Vec<(usize, f64)> = Vec::new();
        for y in window.0..=window.1 {
            let s = score(y as u32);
            if s >= cfg.thick_line_acceptance {
                current.push((y, s));
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        let summarize = |run: &Vec<(usize, f64)>| {
            let total: f64 = run.iter().map(|&(_, s)| s).sum();
            let centroid = run.iter().map(|&(y, s)| y as f64 * s).sum::<f64>() / total;
            (centroid, total / run.len() as f64)
        };

        let (y, mean_score) = runs.iter().map(summarize).fold(None, |best: Option<(f64, f64)>, cand| {
            match best {
                Some(b) if b.1 > cand.1 => Some(b),
                Some(b) if b.1 == cand.1 && (b.0 - center).abs() <= (cand.0 - center).abs() => Some(b),
                _ => Some(cand),
            }
        })?;

        Some((y, mean_score * cfg.weights.thick_neutral_line))
    }

    fn horizontal_edge(&self, features: &EdgeFeatures, window: (usize, usize), center: f64) -> Option<(f64, f64)> {
        let cfg = &self.config;
        let fraction = features.strong_edge_fraction(cfg.edge_strength_threshold);
        let (peak, value) = peak_in_window(&fraction, window.0, window.1, center)?;
        if value < cfg.horizontal_edge_acceptance {
            return None;
        }

        let y = band_centroid(&fraction, peak, cfg.refine_half_band);
        Some((y, (value * cfg.weights.horizontal_edge).min(1.0)))
    }

    fn edge_density(&self, features: &EdgeFeatures, window: (usize, usize), center: f64) -> Option<(f64, f64)> {
        let cfg = &self.config;
        let density = features.edge_density();
        let (peak, value) = peak_in_window(&density, window.0, window.1, center)?;
        if value < cfg.min_edge_density {
            return None;
        }

        let global_max = density.iter().cloned().fold(0.0, f64::max);
        let normalized = (value / global_max).min(1.0);
        let y = band_centroid(&density, peak, cfg.refine_half_band);
        Some((y, normalized * cfg.weights.edge_density))
    }

    fn intensity_gradient(&self, features: &EdgeFeatures, window: (usize, usize), center: f64) -> Option<(f64, f64)> {
        let cfg = &self.config;
        let means = features.row_mean_luminance();
        if means.len() < 2 {
            return None;
        }

        // step[r] sits between rows r and r + 1
        let steps: Vec<f64> = means.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let end = window.1.min(steps.len() - 1);
        let (peak, value) = peak_in_window(&steps, window.0, end, center - 0.5)?;
        if value < cfg.min_luma_step {
            return None;
        }

        let global_max = steps.iter().cloned().fold(0.0, f64::max);
        let normalized = (value / global_max).min(1.0);
        let y = band_centroid(&steps, peak, cfg.refine_half_band) + 0.5;
        Some((y, normalized * cfg.weights.intensity_gradient))
    }
}
