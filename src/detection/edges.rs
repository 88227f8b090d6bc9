//! Shared image features for line detection
//!
//! Computes, once per image:
//! - Rec. 601 luminance plane (and its 8-bit copy)
//! - Vertical Sobel response (3×3, border-clamped)
//! - Per-row profiles derived from both
//!
//! The zero-line locator and the anchor search read these features; neither
//! recomputes them.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::definitions::Image;
use imageproc::gradients::vertical_sobel;

use crate::color::ColorConverter;

/// Largest absolute vertical Sobel response on 8-bit input (4 × 255)
pub const MAX_SOBEL_RESPONSE: f64 = 1020.0;

/// Number of mean-shift iterations in [`band_centroid`]
const CENTROID_ITERATIONS: usize = 3;

/// Fraction of the peak a row must reach to contribute to the centroid
const CENTROID_FLOOR_RATIO: f64 = 0.5;

/// Luminance and vertical-gradient features of one image
#[derive(Debug, Clone)]
pub struct EdgeFeatures {
    width: u32,
    height: u32,
    luma: Vec<f32>,
    gradient: Image<Luma<i16>>,
}

impl EdgeFeatures {
    /// Compute the luminance plane and vertical Sobel map of an image
    pub fn compute(image: &RgbImage) -> Self {
        let converter = ColorConverter::new();
        let (width, height) = image.dimensions();

        let luma: Vec<f32> = image
            .pixels()
            .map(|&Rgb([r, g, b])| converter.luminance(r, g, b))
            .collect();

        let gray = GrayImage::from_fn(width, height, |x, y| {
            let l = luma[(y * width + x) as usize];
            Luma([l.round().clamp(0.0, 255.0) as u8])
        });
        let gradient = vertical_sobel(&gray);

        Self {
            width,
            height,
            luma,
            gradient,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute vertical gradient at a pixel
    pub fn gradient_at(&self, x: u32, y: u32) -> f64 {
        f64::from(self.gradient.get_pixel(x, y).0[0]).abs()
    }

    /// Mean luminance of every row; empty for a zero-width image
    pub fn row_mean_luminance(&self) -> Vec<f64> {
        let w = self.width as usize;
        if w == 0 {
            return Vec::new();
        }
        self.luma
            .chunks(w)
            .map(|row| row.iter().map(|&l| f64::from(l)).sum::<f64>() / w as f64)
            .collect()
    }

    /// Fraction of pixels per row whose |gy| reaches `threshold`
    pub fn strong_edge_fraction(&self, threshold: f64) -> Vec<f64> {
        let width = f64::from(self.width.max(1));
        (0..self.height)
            .map(|y| {
                let strong = (0..self.width)
                    .filter(|&x| self.gradient_at(x, y) >= threshold)
                    .count();
                strong as f64 / width
            })
            .collect()
    }

    /// Mean |gy| per row, normalized to [0, 1]
    pub fn edge_density(&self) -> Vec<f64> {
        let width = f64::from(self.width.max(1));
        (0..self.height)
            .map(|y| {
                let sum: f64 = (0..self.width).map(|x| self.gradient_at(x, y)).sum();
                sum / width / MAX_SOBEL_RESPONSE
            })
            .collect()
    }
}

/// Row window `[start, end]` (inclusive) centered on the vertical midpoint
///
/// The half-height is `ratio × height`, clamped to the image.
pub fn search_window(height: u32, ratio: f64) -> (usize, usize) {
    let last = height.saturating_sub(1) as usize;
    let center = f64::from(height) / 2.0;
    let half = ratio.max(0.0) * f64::from(height);
    let start = (center - half).floor().max(0.0) as usize;
    let end = ((center + half).ceil() as usize).min(last);
    (start.min(last), end)
}

/// Strongest entry of `profile` within `[start, end]`
///
/// Ties are resolved toward `center`, then toward the smaller index.
/// Returns `None` for an empty window or an all-zero profile.
pub fn peak_in_window(profile: &[f64], start: usize, end: usize, center: f64) -> Option<(usize, f64)> {
    let end = end.min(profile.len().checked_sub(1)?);
    let mut best: Option<(usize, f64)> = None;

    for (i, &v) in profile.iter().enumerate().take(end + 1).skip(start) {
        best = match best {
            None => Some((i, v)),
            Some((bi, bv)) => {
                let closer = (i as f64 - center).abs() < (bi as f64 - center).abs();
                if v > bv || (v == bv && closer) {
                    Some((i, v))
                } else {
                    Some((bi, bv))
                }
            }
        };
    }

    best.filter(|&(_, v)| v > 0.0)
}

/// Sub-pixel centroid of the response band around `peak`
///
/// Mean-shift over a `±half_band` window, weighting entries that reach half
/// the peak value. A line produces a response at both its top and bottom
/// edge; the centroid of the pair lands on the line center.
pub fn band_centroid(profile: &[f64], peak: usize, half_band: usize) -> f64 {
    let Some(&peak_value) = profile.get(peak) else {
        return peak as f64;
    };
    let floor = peak_value * CENTROID_FLOOR_RATIO;
    let last = profile.len() - 1;
    let mut center = peak;
    let mut centroid = peak as f64;

    for _ in 0..CENTROID_ITERATIONS {
        let lo = center.saturating_sub(half_band);
        let hi = (center + half_band).min(last);

        let (mut weighted, mut total) = (0.0, 0.0);
        for (i, &v) in profile.iter().enumerate().take(hi + 1).skip(lo) {
            if v >= floor && v > 0.0 {
                weighted += v * i as f64;
                total += v;
            }
        }
        if total <= 0.0 {
            break;
        }

        centroid = weighted / total;
        let next = centroid.round() as usize;
        if next == center {
            break;
        }
        center = next;
    }

    centroid
}
