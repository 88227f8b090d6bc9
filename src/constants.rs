//! Default tunables and reference values for score-graph recovery
//!
//! These are the empirically tuned values observed on the supported family of
//! score-graph displays. They seed the `Default` implementations in
//! [`crate::config`]; nothing in the crate reads them as mutable globals.

/// Supported raster bounds
pub mod image {
    /// Smallest accepted width or height in pixels
    pub const MIN_DIMENSION: u32 = 10;

    /// Largest accepted width or height in pixels
    pub const MAX_DIMENSION: u32 = 16_384;

    /// Only 8-bit RGB input is accepted
    pub const CHANNELS: usize = 3;
}

/// Zero-line localization
pub mod zero_line {
    /// Search window half-height as a fraction of image height
    pub const SEARCH_HALF_HEIGHT_RATIO: f64 = 0.5;

    /// Maximum spread between R, G and B for a neutral pixel
    pub const NEUTRAL_TOLERANCE: u8 = 20;

    /// Intensity band of the neutral zero line
    pub const NEUTRAL_MIN: u8 = 40;
    pub const NEUTRAL_MAX: u8 = 160;

    /// Row fraction required by the thick neutral-line detector
    pub const THICK_LINE_ACCEPTANCE: f64 = 0.8;

    /// Sobel response counted as a strong edge
    pub const EDGE_STRENGTH_THRESHOLD: f64 = 200.0;

    /// Row fraction of strong edges required by the horizontal-edge detector
    pub const HORIZONTAL_EDGE_ACCEPTANCE: f64 = 0.6;

    /// Minimum normalized edge density for the density-profile detector
    pub const MIN_EDGE_DENSITY: f64 = 0.02;

    /// Minimum change in mean row luminance for the gradient detector
    pub const MIN_LUMA_STEP: f64 = 2.0;

    /// Confidence weights, highest for the most precise method
    pub const THICK_LINE_WEIGHT: f64 = 1.0;
    pub const HORIZONTAL_EDGE_WEIGHT: f64 = 0.9;
    pub const EDGE_DENSITY_WEIGHT: f64 = 0.85;
    pub const INTENSITY_GRADIENT_WEIGHT: f64 = 0.8;

    /// Half-width of the band used for sub-pixel centroid refinement
    pub const REFINE_HALF_BAND: usize = 12;

    /// Row used when no detector fires
    pub const FALLBACK_Y: f64 = 250.0;

    /// Pixel spread at which detector agreement drops to zero
    pub const AGREEMENT_SPREAD_PX: f64 = 10.0;
}

/// Scale calibration
pub mod calibration {
    /// Value of the top gridline on the score graph
    pub const ANCHOR_VALUE: f64 = 30_000.0;

    /// Row of the top gridline in a cropped graph
    pub const DEFAULT_ANCHOR_Y: f64 = 4.0;

    /// Distance from the default anchor row a detected gridline may lie
    pub const ANCHOR_SEARCH_TOLERANCE: f64 = 15.0;

    /// Row fraction of strong edges required for a gridline
    pub const MIN_ANCHOR_LINE_FRACTION: f64 = 0.5;

    /// Rows next to the zero line excluded from the anchor search
    pub const MIN_ANCHOR_GAP: f64 = 20.0;
}

/// Color line tracing
pub mod trace {
    /// Minimum present columns for a trace to count as found
    pub const MIN_PRESENT_COLUMNS: usize = 10;
}

/// Statistics extraction
pub mod statistics {
    /// Smallest one-column rise that counts as a payout
    pub const FIRST_HIT_MIN_RISE: f64 = 100.0;

    /// Allowed drop on the column after the rise
    pub const FIRST_HIT_REBOUND_TOLERANCE: f64 = 50.0;

    /// Value below which the series still counts as near baseline
    pub const FIRST_HIT_BASELINE_CEILING: f64 = 2_000.0;

    /// Columns scanned for the first hit
    pub const FIRST_HIT_SCAN_WINDOW: usize = 150;

    /// Columns averaged for the trend-reversal fallback
    pub const TREND_WINDOW: usize = 5;

    /// Present columns required before statistics are computed
    pub const MIN_PRESENT_COLUMNS: usize = 1;
}

/// Confidence bands
pub mod thresholds {
    /// Below this fused confidence the zero line is flagged low-confidence
    pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;

    /// Below this detector agreement the zero line is flagged low-confidence
    pub const MIN_AGREEMENT: f64 = 0.5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_bounds() {
        assert!(image::MIN_DIMENSION < image::MAX_DIMENSION);
        assert_eq!(image::CHANNELS, 3);
    }

    #[test]
    fn test_neutral_band() {
        assert!(zero_line::NEUTRAL_MIN < zero_line::NEUTRAL_MAX);
        assert!(zero_line::HORIZONTAL_EDGE_ACCEPTANCE < zero_line::THICK_LINE_ACCEPTANCE);
    }

    #[test]
    fn test_detector_weights_descend() {
        assert!(zero_line::THICK_LINE_WEIGHT > zero_line::HORIZONTAL_EDGE_WEIGHT);
        assert!(zero_line::HORIZONTAL_EDGE_WEIGHT > zero_line::EDGE_DENSITY_WEIGHT);
        assert!(zero_line::EDGE_DENSITY_WEIGHT > zero_line::INTENSITY_GRADIENT_WEIGHT);
    }

    #[test]
    fn test_threshold_ranges() {
        assert!(thresholds::LOW_CONFIDENCE_THRESHOLD > 0.0 && thresholds::LOW_CONFIDENCE_THRESHOLD < 1.0);
        assert!(thresholds::MIN_AGREEMENT > 0.0 && thresholds::MIN_AGREEMENT < 1.0);
        assert!(statistics::FIRST_HIT_REBOUND_TOLERANCE < statistics::FIRST_HIT_MIN_RISE);
    }
}
