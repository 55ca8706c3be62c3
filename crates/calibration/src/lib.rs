//! Gaze Calibration
//!
//! Learns a personalized mapping from face-relative raw eye positions to
//! normalized screen coordinates:
//! - fixed target sequences (5, 9 or 13 points)
//! - per-point fixation gating, adaptive dwell, burst sampling and timeouts
//! - least-squares fit with per-quadrant residual correction
//! - a fresh 9-point accuracy test
//! - versioned profiles for reload without recalibration

mod accuracy;
mod config;
mod engine;
mod error;
mod persistence;
mod points;
mod transform;

pub use accuracy::{score_points, CalibrationAccuracy, PointAccuracy};
pub use config::{CalibrationConfig, FitModel, GateReference, ValidationConfig};
pub use engine::{CalibrationEngine, CalibrationEvent, CalibrationOutcome, CalibrationState};
pub use error::CalibrationError;
pub use persistence::{CalibrationProfile, PROFILE_VERSION};
pub use points::{calibration_points, validation_points, CalibrationMode, CalibrationPoint};
pub use transform::{CalibrationSample, CalibrationTransform, Quadrant};
