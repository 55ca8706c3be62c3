//! Gaze Statistics
//!
//! Provides windowed statistics over gaze signals and the least-squares
//! fits used to learn calibration transforms.

mod regression;
mod statistics;

pub use regression::{AffineFit, LinearFit};
pub use statistics::{distance, WindowStats};

use thiserror::Error;

/// Errors raised by the fitting routines
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Not enough samples for the requested fit
    #[error("Need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Inputs have no spread; the system is singular
    #[error("Degenerate input: {0}")]
    Degenerate(&'static str),

    /// Non-finite value in the input
    #[error("Non-finite sample at index {0}")]
    NonFinite(usize),
}
