//! Pixel color conversion utilities
//!
//! Provides the per-pixel conversions used by the detectors:
//! - RGB (0-255) to HSV with hue in degrees, saturation and value in [0, 1]
//! - Rec. 601 luminance
//! - Neutral (gray) pixel classification

use image::{Rgb, RgbImage};
use palette::{FromColor, Hsv, Srgb};

/// HSV triple with hue in degrees [0, 360) and saturation/value in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvPixel {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

/// Row-major HSV plane computed once per image and shared by all profiles
#[derive(Debug, Clone)]
pub struct HsvImage {
    width: u32,
    height: u32,
    pixels: Vec<HsvPixel>,
}

impl HsvImage {
    /// Convert an RGB raster into an HSV plane
    pub fn from_rgb(image: &RgbImage) -> Self {
        let converter = ColorConverter::new();
        let pixels = image
            .pixels()
            .map(|&Rgb([r, g, b])| converter.rgb_to_hsv(r, g, b))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at column `x`, row `y`
    ///
    /// Panics if the coordinate is outside the plane.
    pub fn get(&self, x: u32, y: u32) -> HsvPixel {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Stateless color converter
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert RGB (0-255) to HSV
    ///
    /// Achromatic pixels report hue 0.
    pub fn rgb_to_hsv(&self, r: u8, g: u8, b: u8) -> HsvPixel {
        let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        let hsv: Hsv = Hsv::from_color(srgb);
        HsvPixel {
            hue: hsv.hue.into_positive_degrees() % 360.0,
            saturation: hsv.saturation,
            value: hsv.value,
        }
    }

    /// Luminance (Rec. 601 weights) in [0, 255]
    pub fn luminance(&self, r: u8, g: u8, b: u8) -> f32 {
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    }

    /// Check whether R, G and B are mutually within `tolerance`
    pub fn is_neutral(&self, r: u8, g: u8, b: u8, tolerance: u8) -> bool {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        max - min <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let converter = ColorConverter::new();

        let red = converter.rgb_to_hsv(255, 0, 0);
        assert!(red.hue < 0.5 || red.hue > 359.5);
        assert!((red.saturation - 1.0).abs() < 1e-4);
        assert!((red.value - 1.0).abs() < 1e-4);

        let blue = converter.rgb_to_hsv(0, 0, 255);
        assert!((blue.hue - 240.0).abs() < 0.5);

        let green = converter.rgb_to_hsv(0, 255, 0);
        assert!((green.hue - 120.0).abs() < 0.5);
    }

    #[test]
    fn test_rgb_to_hsv_hot_pink() {
        let converter = ColorConverter::new();
        let pink = converter.rgb_to_hsv(255, 105, 180);
        assert!((pink.hue - 330.0).abs() < 1.0);
        assert!(pink.saturation > 0.5);
        assert!(pink.value > 0.99);
    }

    #[test]
    fn test_rgb_to_hsv_gray_is_unsaturated() {
        let converter = ColorConverter::new();
        let gray = converter.rgb_to_hsv(100, 100, 100);
        assert!(gray.saturation < 1e-4);
        assert!((gray.value - 100.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_luminance() {
        let converter = ColorConverter::new();
        assert!((converter.luminance(255, 255, 255) - 255.0).abs() < 0.01);
        assert!(converter.luminance(0, 0, 0).abs() < 0.01);
        assert!((converter.luminance(90, 90, 90) - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_is_neutral() {
        let converter = ColorConverter::new();
        assert!(converter.is_neutral(100, 105, 95, 20));
        assert!(!converter.is_neutral(255, 105, 180, 20));
    }

    #[test]
    fn test_hsv_image_indexing() {
        let mut image = RgbImage::from_pixel(4, 3, Rgb([255, 255, 255]));
        image.put_pixel(2, 1, Rgb([0, 0, 255]));

        let hsv = HsvImage::from_rgb(&image);
        assert_eq!(hsv.width(), 4);
        assert_eq!(hsv.height(), 3);
        assert!((hsv.get(2, 1).hue - 240.0).abs() < 0.5);
        assert!(hsv.get(0, 0).saturation < 1e-4);
    }
}
