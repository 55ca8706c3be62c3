//! Gaze Selection Pipeline
//!
//! One synchronous tick per camera frame:
//! face region → pupils → stabilized gaze → calibration or selection.
//!
//! Hosts call [`GazePipeline::process_frame`] and read everything the tick
//! produced from the returned [`FrameResult`]. Selection feedback can also be
//! pushed to a [`SelectionSink`](selection::SelectionSink).

mod config;
mod governor;
mod pipeline;
mod provider;
mod result;

pub use crate::config::{ConfigError, PipelineConfig, ProvisionalMapping, ResolutionConfig, SelectionMode, ENV_PREFIX};
pub use governor::ResolutionGovernor;
pub use pipeline::GazePipeline;
pub use provider::FaceBoxProvider;
pub use result::{DebugFrame, FrameIssue, FrameResult};

use calibration::CalibrationError;
use eye_detect::DetectError;
use frame_input::FrameError;
use gaze_filter::FilterError;
use selection::SelectionError;
use thiserror::Error;

/// Pipeline error types
///
/// Per-frame detection problems are reported as [`FrameIssue`]s; only
/// structurally invalid input and configuration fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Detector error: {0}")]
    Detect(#[from] DetectError),

    #[error("Stabilizer error: {0}")]
    Filter(#[from] FilterError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame timestamp went backwards: {current}ms after {previous}ms")]
    NonMonotonicTimestamp { previous: u64, current: u64 },
}
