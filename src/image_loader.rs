//! Image loading and validation
//!
//! This module turns files, encoded byte buffers or raw pixel buffers into the
//! 8-bit RGB raster the analysis stages read.
//!
//! ## Supported Formats
//!
//! Everything the `image` crate decodes with its default features:
//! - JPEG, PNG, GIF, WebP, TIFF, BMP, ICO, TGA, EXR, PNM, QOI, DDS, HDR, AVIF
//!
//! The format is guessed from the file contents, not the extension, so
//! screenshots saved with the wrong suffix still load.
//!
//! ## Design
//!
//! Every loaded image is converted to RGB8 and checked against the supported
//! dimension range before it reaches a detector.

use std::path::Path;

use image::{ImageReader, RgbImage};

use crate::constants::image::{CHANNELS, MAX_DIMENSION, MIN_DIMENSION};
use crate::error::{AnalysisError, Result};

/// Load an image from disk as RGB8
///
/// # Arguments
///
/// * `path` - Path to the image file
///
/// # Errors
///
/// Returns `ImageLoadError` if the file cannot be opened or decoded, and
/// `IncompatibleImage` if its dimensions are outside the supported range
///
/// # Example
///
/// ```rust,no_run
/// use scan_graph::image_loader::load_image;
/// use std::path::Path;
///
/// let image = load_image(Path::new("graph.png"))?;
/// println!("Loaded image: {}x{}", image.width(), image.height());
/// # Ok::<(), scan_graph::AnalysisError>(())
/// ```
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| AnalysisError::image_load(format!("Failed to read image file: {}", path.display()), e))?;

    let decoded = reader
        .decode()
        .map_err(|e| AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e))?;

    let rgb = decoded.to_rgb8();
    validate_image(&rgb)?;
    Ok(rgb)
}

/// Decode an in-memory encoded image (e.g. an uploaded PNG) as RGB8
pub fn load_image_from_memory(bytes: &[u8]) -> Result<RgbImage> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AnalysisError::image_load("Failed to decode image buffer", e))?;
    let rgb = decoded.to_rgb8();
    validate_image(&rgb)?;
    Ok(rgb)
}

/// Wrap a raw interleaved pixel buffer, row-major from the top-left
///
/// # Errors
///
/// Returns `IncompatibleImage` if `channels` is not 3, the buffer length does
/// not match the dimensions, or the dimensions are out of range
pub fn from_raw(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<RgbImage> {
    if channels != CHANNELS {
        return Err(AnalysisError::IncompatibleImage {
            reason: format!("expected {CHANNELS} channels, got {channels}"),
        });
    }

    let expected = width as usize * height as usize * CHANNELS;
    if data.len() != expected {
        return Err(AnalysisError::IncompatibleImage {
            reason: format!("buffer holds {} bytes, {width}x{height} RGB needs {expected}", data.len()),
        });
    }

    let image = RgbImage::from_raw(width, height, data).ok_or_else(|| AnalysisError::IncompatibleImage {
        reason: format!("buffer does not fit {width}x{height}"),
    })?;
    validate_image(&image)?;
    Ok(image)
}

/// Check that both dimensions are within the supported range
pub fn validate_image(image: &RgbImage) -> Result<()> {
    let (width, height) = image.dimensions();
    let range = MIN_DIMENSION..=MAX_DIMENSION;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(AnalysisError::IncompatibleImage {
            reason: format!(
                "{width}x{height} is outside the supported range {MIN_DIMENSION}..={MAX_DIMENSION} per side"
            ),
        });
    }
    Ok(())
}

/// Get list of file extensions the loader recognizes
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "jpg", "jpeg", "png", "gif", "webp", "tiff", "tif", "bmp", "ico", "tga", "exr", "pbm", "pgm", "ppm", "pnm",
        "qoi", "dds", "hdr", "avif",
    ]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

/// Check if a path has a supported image extension
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_extension)
}
