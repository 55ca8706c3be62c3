//! Eye Detection
//!
//! Per-frame computer vision for gaze input:
//! - Face region estimation (external box passthrough or skin-tone fallback)
//! - Pupil detection with several independent methods fused by confidence
//! - Head pose approximation from face and eye geometry

pub mod color;
pub mod config;
pub mod face;
pub mod pose;
pub mod pupil;

pub use config::{DetectorConfig, FaceEstimatorConfig, MethodSet, PoseConfig, PupilConfig};
pub use face::FaceRegionEstimator;
pub use pose::PoseEstimator;
pub use pupil::{DetectionMethod, EyeCandidate, EyeDetection, EyePair, EyeSide, PupilDetector};

use thiserror::Error;

/// Detection error types
///
/// Per-frame misses are not errors; they surface as undetected eyes or a
/// missing face region.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("Configuration error: {0}")]
    Config(String),
}
