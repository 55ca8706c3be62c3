//! Calibration Error Types

use gaze_stats::StatsError;
use thiserror::Error;

/// Errors raised by calibration operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("Not enough calibration points: need {required}, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    #[error("Degenerate calibration data: {0}")]
    DegenerateFit(#[from] StatsError),

    #[error("Fitted scale is zero on the {0} axis")]
    ZeroScale(&'static str),

    #[error("Unsupported profile version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Profile encoding failed: {0}")]
    Encode(String),

    #[error("Profile decoding failed: {0}")]
    Decode(String),

    #[error("A calibration session is in progress")]
    SessionActive,

    #[error("Invalid configuration: {0}")]
    Config(String),
}
