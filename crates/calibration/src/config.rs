//! Calibration configuration

use crate::error::CalibrationError;
use crate::points::CalibrationMode;
use gaze_filter::GateConfig;
use serde::{Deserialize, Serialize};

/// Distance reference for the per-point stability gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GateReference {
    /// Distance to the on-screen target (needs a usable provisional mapping)
    Target,
    /// Distance to the previous smoothed gaze point
    #[default]
    Fixation,
}

/// Model fitted from the calibration samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitModel {
    /// Independent least-squares line per axis, no skew
    #[default]
    PerAxis,
    /// Full 2D affine map including skew terms
    Affine,
}

/// Accuracy test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Measurement time per test point (milliseconds)
    pub duration_ms: u64,

    /// Initial part of each test point ignored while the gaze moves over
    pub settle_ms: u64,

    /// Mean error at which the distance score reaches zero (px)
    pub max_error_px: f64,

    /// Error standard deviation at which the dispersion score reaches zero (px)
    pub max_dispersion_px: f64,

    /// Samples below this confidence count as invalid
    pub min_confidence: f64,

    /// Overall accuracy below this recommends recalibration
    pub recalibration_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000,
            settle_ms: 300,
            max_error_px: 200.0,
            max_dispersion_px: 100.0,
            min_confidence: 0.2,
            recalibration_threshold: 0.75,
        }
    }
}

/// Calibration engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub mode: CalibrationMode,

    /// Screen size in pixels
    pub viewport: (f64, f64),

    /// Gaze must stay within this radius of the reference (px)
    pub accuracy_threshold_px: f64,

    /// Stable time needed to complete a point (milliseconds)
    pub required_stable_ms: u64,

    /// Required time multiplier when the gaze is well inside the threshold
    pub adaptive_factor: f64,

    /// Raw samples recorded when a point completes
    pub burst_samples: usize,

    /// Input lock between points (milliseconds)
    pub settle_ms: u64,

    /// A point is abandoned after `timeout_factor × required_stable_ms`
    pub timeout_factor: f64,

    /// Longest frame gap credited as stable time (milliseconds)
    pub max_frame_gap_ms: u64,

    pub gate_reference: GateReference,
    pub fit_model: FitModel,
    pub gate: GateConfig,

    /// Score accuracy from the calibration samples instead of a test pass
    pub skip_validation: bool,
    pub validation: ValidationConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::Standard9,
            viewport: (1920.0, 1080.0),
            accuracy_threshold_px: 100.0,
            required_stable_ms: 1000,
            adaptive_factor: 0.7,
            burst_samples: 5,
            settle_ms: 300,
            timeout_factor: 4.0,
            max_frame_gap_ms: 100,
            gate_reference: GateReference::Fixation,
            fit_model: FitModel::PerAxis,
            gate: GateConfig::default(),
            skip_validation: false,
            validation: ValidationConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Five points, no accuracy test
    pub fn quick() -> Self {
        Self {
            mode: CalibrationMode::Quick5,
            required_stable_ms: 700,
            skip_validation: true,
            ..Default::default()
        }
    }

    /// Thirteen points with the affine model
    pub fn thorough() -> Self {
        Self {
            mode: CalibrationMode::Extended13,
            fit_model: FitModel::Affine,
            required_stable_ms: 1200,
            ..Default::default()
        }
    }

    /// Time after which a point is abandoned (milliseconds)
    pub fn point_timeout_ms(&self) -> u64 {
        (self.required_stable_ms as f64 * self.timeout_factor).round() as u64
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.viewport.0 <= 0.0 || self.viewport.1 <= 0.0 {
            return Err(CalibrationError::Config(format!(
                "viewport must be positive, got {:?}",
                self.viewport
            )));
        }
        if self.accuracy_threshold_px <= 0.0 || self.required_stable_ms == 0 {
            return Err(CalibrationError::Config(
                "accuracy threshold and required stable time must be positive".into(),
            ));
        }
        if !(self.adaptive_factor > 0.0 && self.adaptive_factor <= 1.0) {
            return Err(CalibrationError::Config("adaptive_factor must be within (0, 1]".into()));
        }
        if self.burst_samples == 0 {
            return Err(CalibrationError::Config("burst_samples must be at least 1".into()));
        }
        if self.timeout_factor < 1.0 {
            return Err(CalibrationError::Config("timeout_factor must be at least 1".into()));
        }
        self.gate
            .validate()
            .map_err(|e| CalibrationError::Config(e.to_string()))?;
        Ok(())
    }
}
