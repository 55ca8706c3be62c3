//! Filter Error Types

use thiserror::Error;

/// Errors raised by the gaze filters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Coordinate is NaN or infinite
    #[error("{field} is not finite")]
    NonFinite { field: &'static str },

    /// Origin reported on consecutive frames (detector stuck)
    #[error("Repeated zero coordinates")]
    RepeatedOrigin,

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Invalid filter configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
