//! Color line tracing
//!
//! For one color profile, builds a stroke mask from the HSV plane, optionally
//! smooths it with a binary close/open, then scans every column independently
//! for the first stroke run in the profile's scan direction. Runs are accepted
//! with saturation hysteresis so faint grid or watermark pixels of a similar
//! hue do not capture the scan.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::{ColorProfile, HsvImage, ScanDirection};
use crate::image_loader::validate_image;
use crate::signal::TracedSignal;
use crate::{AnalysisError, Result};

const MASK_ON: u8 = 255;

/// Traced signal labelled with the profile that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTrace {
    pub profile: String,
    pub signal: TracedSignal,
}

/// Per-column line tracer
#[derive(Debug, Clone)]
pub struct LineTracer {
    min_present_columns: usize,
}

impl Default for LineTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTracer {
    /// Create a tracer with the default presence requirement
    pub fn new() -> Self {
        Self {
            min_present_columns: crate::constants::trace::MIN_PRESENT_COLUMNS,
        }
    }

    /// Create a tracer requiring `min_present_columns` for a usable trace
    pub fn with_min_present(min_present_columns: usize) -> Self {
        Self { min_present_columns }
    }

    /// Trace one profile over an RGB image
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleImage` for unsupported dimensions
    pub fn trace_image(&self, image: &RgbImage, profile: &ColorProfile) -> Result<TracedSignal> {
        validate_image(image)?;
        Ok(self.trace(&HsvImage::from_rgb(image), profile))
    }

    /// Trace one profile over a precomputed HSV plane
    ///
    /// Never fails: columns without a stroke are absent, and a mask with fewer
    /// than `min_pixel_count` pixels yields an all-absent signal.
    pub fn trace(&self, hsv: &HsvImage, profile: &ColorProfile) -> TracedSignal {
        let width = hsv.width() as usize;
        let mask = stroke_mask(hsv, profile);

        let matched = mask.pixels().filter(|p| p.0[0] > 0).count();
        if matched < profile.min_pixel_count {
            debug!(
                profile = %profile.name,
                matched,
                required = profile.min_pixel_count,
                "too few matching pixels"
            );
            return TracedSignal::absent(width);
        }

        let samples: Vec<Option<f64>> = (0..hsv.width())
            .into_par_iter()
            .map(|x| scan_column(hsv, &mask, profile, x))
            .collect();

        let signal = TracedSignal::new(samples);
        debug!(
            profile = %profile.name,
            matched,
            present = signal.present_count(),
            gaps = signal.gap_count(),
            "profile traced"
        );
        signal
    }

    /// Trace one profile and require enough present columns
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSignal` if fewer than the configured minimum of
    /// columns carry a sample
    pub fn trace_profile(&self, hsv: &HsvImage, profile: &ColorProfile) -> Result<ProfileTrace> {
        let signal = self.trace(hsv, profile);
        self.check(profile, &signal)?;
        Ok(ProfileTrace {
            profile: profile.name.clone(),
            signal,
        })
    }

    /// Trace every candidate and keep the best one
    ///
    /// The winner has the most present columns, then the fewest gaps, then
    /// comes first in `candidates`. Candidates below the presence minimum are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSignal` for the strongest candidate when none
    /// qualifies, or `InvalidParameter` when `candidates` is empty
    pub fn select(&self, hsv: &HsvImage, candidates: &[&ColorProfile]) -> Result<ProfileTrace> {
        let mut best: Option<(&ColorProfile, TracedSignal)> = None;

        for &profile in candidates {
            let signal = self.trace(hsv, profile);
            let better = match &best {
                None => true,
                Some((_, current)) => {
                    signal.present_count() > current.present_count()
                        || (signal.present_count() == current.present_count()
                            && signal.gap_count() < current.gap_count())
                }
            };
            if better {
                best = Some((profile, signal));
            }
        }

        let (profile, signal) = best.ok_or_else(|| AnalysisError::invalid_parameter("trace.candidates", "[]"))?;
        if let Err(err) = self.check(profile, &signal) {
            warn!(profile = %profile.name, "no candidate profile produced a usable trace");
            return Err(err);
        }

        info!(
            profile = %profile.name,
            present = signal.present_count(),
            gaps = signal.gap_count(),
            "selected line profile"
        );
        Ok(ProfileTrace {
            profile: profile.name.clone(),
            signal,
        })
    }

    fn check(&self, profile: &ColorProfile, signal: &TracedSignal) -> Result<()> {
        let present = signal.present_count();
        if present == 0 || present < self.min_present_columns {
            return Err(AnalysisError::InsufficientSignal {
                profile: profile.name.clone(),
                present,
                required: self.min_present_columns.max(1),
            });
        }
        Ok(())
    }
}

/// Binary mask of stroke candidates, smoothed per profile
pub fn stroke_mask(hsv: &HsvImage, profile: &ColorProfile) -> GrayImage {
    let mask = GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
        if profile.is_candidate(hsv.get(x, y)) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    });

    match profile.kernel_radius {
        0 => mask,
        k => open(&close(&mask, Norm::LInf, k), Norm::LInf, k),
    }
}

/// First accepted stroke run in one column, offset to the stroke center
fn scan_column(hsv: &HsvImage, mask: &GrayImage, profile: &ColorProfile, x: u32) -> Option<f64> {
    let height = hsv.height();
    let rows: Box<dyn Iterator<Item = u32>> = match profile.scan {
        ScanDirection::TopDown => Box::new(0..height),
        ScanDirection::BottomUp => Box::new((0..height).rev()),
    };

    let mut run_start: Option<u32> = None;
    let mut run_strong = false;

    for y in rows.chain(std::iter::once(u32::MAX)) {
        let on = y != u32::MAX && mask.get_pixel(x, y).0[0] > 0;
        if on {
            if run_start.is_none() {
                run_start = Some(y);
            }
            run_strong |= profile.is_strong(hsv.get(x, y));
            continue;
        }
        if let Some(start) = run_start.take() {
            if run_strong {
                return Some(center_row(start, profile, height));
            }
            run_strong = false;
        }
    }
    None
}

fn center_row(first: u32, profile: &ColorProfile, height: u32) -> f64 {
    let max_row = f64::from(height.saturating_sub(1));
    let row = match profile.scan {
        ScanDirection::TopDown => f64::from(first) + profile.peak_offset,
        ScanDirection::BottomUp => f64::from(first) - profile.peak_offset,
    };
    row.clamp(0.0, max_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ProfileTable;
    use image::Rgb;

    const PINK: Rgb<u8> = Rgb([255, 60, 200]);
    const BLUE: Rgb<u8> = Rgb([30, 60, 230]);

    /// Dark canvas with a horizontal stroke of `color` starting at `top`
    fn stroke_image(width: u32, height: u32, top: u32, thickness: u32, color: Rgb<u8>) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| {
            if y >= top && y < top + thickness {
                color
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    fn builtin(name: &str) -> ColorProfile {
        ProfileTable::builtin().get(name).unwrap().clone()
    }

    #[test]
    fn test_trace_covers_full_width() {
        let image = stroke_image(50, 80, 30, 3, BLUE);
        let signal = LineTracer::new().trace_image(&image, &builtin("blue")).unwrap();
        assert_eq!(signal.len(), 50);
        assert_eq!(signal.present_count(), 50);
        for (_, y) in signal.present() {
            assert_eq!(y, 31.0);
        }
    }

    #[test]
    fn test_thick_stroke_survives_smoothing() {
        let image = stroke_image(60, 80, 40, 4, PINK);
        let pink = builtin("pink");
        assert_eq!(pink.kernel_radius, 1);

        let signal = LineTracer::new().trace_image(&image, &pink).unwrap();
        assert_eq!(signal.present_count(), 60);
        assert_eq!(signal.get(30), Some(41.0));
    }

    #[test]
    fn test_column_without_stroke_is_absent() {
        let mut image = stroke_image(40, 60, 20, 3, BLUE);
        for y in 0..60 {
            image.put_pixel(7, y, Rgb([10, 10, 10]));
        }
        let signal = LineTracer::new().trace_image(&image, &builtin("blue")).unwrap();
        assert_eq!(signal.get(7), None);
        assert_eq!(signal.present_count(), 39);
        assert_eq!(signal.gap_count(), 1);
    }

    #[test]
    fn test_scan_direction_picks_nearest_run() {
        let mut image = stroke_image(30, 80, 10, 3, BLUE);
        for x in 0..30 {
            for y in 60..63 {
                image.put_pixel(x, y, BLUE);
            }
        }

        let mut profile = builtin("blue");
        let tracer = LineTracer::new();
        assert_eq!(tracer.trace_image(&image, &profile).unwrap().get(0), Some(11.0));

        profile.scan = ScanDirection::BottomUp;
        assert_eq!(tracer.trace_image(&image, &profile).unwrap().get(0), Some(61.0));
    }

    #[test]
    fn test_faint_run_is_skipped_by_hysteresis() {
        let faint = Rgb([200, 190, 230]);
        let mut image = stroke_image(30, 80, 50, 3, BLUE);
        for x in 0..30 {
            for y in 20..23 {
                image.put_pixel(x, y, faint);
            }
        }

        let mut profile = builtin("blue");
        profile.hue = crate::color::HueRange::new(220.0, 260.0);
        profile.edge.low = 0.1;
        profile.edge.high = 0.5;

        let signal = LineTracer::new().trace_image(&image, &profile).unwrap();
        assert_eq!(signal.get(3), Some(51.0));
    }

    #[test]
    fn test_zero_width_image_is_incompatible() {
        let err = LineTracer::new()
            .trace_image(&RgbImage::new(0, 50), &builtin("blue"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::IncompatibleImage { .. }));
    }

    #[test]
    fn test_too_few_pixels_gives_absent_trace() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
        image.put_pixel(5, 5, BLUE);
        let signal = LineTracer::new().trace_image(&image, &builtin("blue")).unwrap();
        assert_eq!(signal.len(), 40);
        assert_eq!(signal.present_count(), 0);
    }

    #[test]
    fn test_trace_profile_reports_insufficient_signal() {
        let image = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
        let hsv = HsvImage::from_rgb(&image);
        match LineTracer::new().trace_profile(&hsv, &builtin("pink")) {
            Err(AnalysisError::InsufficientSignal { profile, present, .. }) => {
                assert_eq!(profile, "pink");
                assert_eq!(present, 0);
            }
            other => panic!("expected InsufficientSignal, got {other:?}"),
        }
    }

    #[test]
    fn test_select_prefers_most_present_columns() {
        let mut image = stroke_image(60, 80, 20, 3, BLUE);
        for x in 0..20 {
            for y in 50..54 {
                image.put_pixel(x, y, PINK);
            }
        }

        let table = ProfileTable::builtin();
        let hsv = HsvImage::from_rgb(&image);
        let candidates = table.select(&["pink".to_string(), "blue".to_string()]).unwrap();
        let best = LineTracer::new().select(&hsv, &candidates).unwrap();
        assert_eq!(best.profile, "blue");
        assert_eq!(best.signal.present_count(), 60);
    }

    #[test]
    fn test_select_with_no_line_fails() {
        let image = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
        let table = ProfileTable::builtin();
        let hsv = HsvImage::from_rgb(&image);
        let candidates = table.select(&[]).unwrap();
        let err = LineTracer::new().select(&hsv, &candidates).unwrap_err();
        assert!(err.is_recoverable());
    }
}
