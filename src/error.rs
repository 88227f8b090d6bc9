//! Error types for the scan_graph library

use thiserror::Error;

/// Result type alias for scan_graph operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error taxonomy for score-graph recovery
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image file could not be opened or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Image dimensions or channel layout outside the supported bounds
    #[error("Incompatible image: {reason}")]
    IncompatibleImage { reason: String },

    /// No zero-line detector met its acceptance threshold
    #[error("Zero line detection unavailable: {reason}")]
    DetectionUnavailable { reason: String },

    /// Anchor coincides with the zero line or yields a non-positive scale
    #[error(
        "Degenerate calibration: zero_y = {zero_y}, anchor_y = {anchor_y}, anchor_value = {anchor_value}"
    )]
    DegenerateCalibration {
        zero_y: f64,
        anchor_y: f64,
        anchor_value: f64,
    },

    /// Traced signal has too few present columns for the chosen profile
    #[error("Insufficient signal for profile '{profile}': {present} present columns (minimum {required})")]
    InsufficientSignal {
        profile: String,
        present: usize,
        required: usize,
    },

    /// Requested color profile is not in the profile table
    #[error("Unknown color profile: {name}")]
    UnknownProfile { name: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Configuration file could not be read, parsed or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AnalysisError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Check if this error indicates a recoverable condition
    ///
    /// Zero-line unavailability can be covered by a configured fallback row,
    /// and an insufficient trace can be retried with another color profile.
    /// Everything else is deterministic for the given input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::DetectionUnavailable { .. } | AnalysisError::InsufficientSignal { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            AnalysisError::IncompatibleImage { .. } => {
                "The image size or format is not supported. Please upload a cropped graph screenshot.".to_string()
            }
            AnalysisError::DetectionUnavailable { .. } => {
                "Could not find the zero line. Please set it manually.".to_string()
            }
            AnalysisError::DegenerateCalibration { .. } => {
                "The scale reference line overlaps the zero line. Please adjust the reference line.".to_string()
            }
            AnalysisError::InsufficientSignal { profile, .. } => {
                format!(
                    "Could not trace a {} graph line. Please select a different line color.",
                    profile
                )
            }
            AnalysisError::UnknownProfile { name } => {
                format!("Line color '{}' is not supported.", name)
            }
            _ => "Graph analysis failed. Please try with a different image.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let unavailable = AnalysisError::DetectionUnavailable {
            reason: "no detector fired".into(),
        };
        assert!(unavailable.is_recoverable());

        let insufficient = AnalysisError::InsufficientSignal {
            profile: "pink".into(),
            present: 0,
            required: 10,
        };
        assert!(insufficient.is_recoverable());

        let degenerate = AnalysisError::DegenerateCalibration {
            zero_y: 250.0,
            anchor_y: 250.0,
            anchor_value: 30000.0,
        };
        assert!(!degenerate.is_recoverable());

        let incompatible = AnalysisError::IncompatibleImage {
            reason: "2 channels".into(),
        };
        assert!(!incompatible.is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::InsufficientSignal {
            profile: "blue".into(),
            present: 3,
            required: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient signal for profile 'blue': 3 present columns (minimum 10)"
        );
        assert!(err.user_message().contains("blue"));

        let err = AnalysisError::invalid_parameter("search_half_height_ratio", 1.5);
        assert_eq!(err.to_string(), "Invalid parameter: search_half_height_ratio = 1.5");
    }

    #[test]
    fn test_image_load_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = AnalysisError::image_load("Failed to open graph.png", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("graph.png"));
    }
}
