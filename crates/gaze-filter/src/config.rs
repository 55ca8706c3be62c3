//! Stabilizer and gate configuration

use crate::FilterError;
use serde::{Deserialize, Serialize};

/// Whether the reported position is smoothed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SmoothingMode {
    #[default]
    Smoothed,
    /// Report the latest accepted position unchanged
    Raw,
}

/// Gaze stabilizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Accepted samples kept in history
    pub history_size: usize,

    /// EMA factor; weight of the newest sample
    pub smoothing_alpha: f64,

    pub mode: SmoothingMode,

    /// Jump threshold = clamp(base + gain * mean_step, min, max), screen pixels
    pub jump_threshold_base: f64,
    pub jump_threshold_gain: f64,
    pub jump_threshold_min: f64,
    pub jump_threshold_max: f64,

    /// Consecutive rejections after which history re-anchors at the new position
    pub max_consecutive_rejections: u32,

    /// Inter-frame displacements used for the stability score
    pub stability_steps: usize,

    /// Displacement variance (px^2) at which stability drops to 0.5
    pub stability_scale: f64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            smoothing_alpha: 0.3,
            mode: SmoothingMode::Smoothed,
            jump_threshold_base: 250.0,
            jump_threshold_gain: 2.0,
            jump_threshold_min: 250.0,
            jump_threshold_max: 500.0,
            max_consecutive_rejections: 5,
            stability_steps: 3,
            stability_scale: 100.0,
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.history_size < 2 {
            return Err(FilterError::Config("history_size must be at least 2".into()));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(FilterError::OutOfRange {
                field: "smoothing_alpha",
                value: self.smoothing_alpha,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.jump_threshold_min <= 0.0 || self.jump_threshold_min > self.jump_threshold_max {
            return Err(FilterError::Config(format!(
                "invalid jump threshold bounds [{}, {}]",
                self.jump_threshold_min, self.jump_threshold_max
            )));
        }
        if self.stability_scale <= 0.0 {
            return Err(FilterError::Config("stability_scale must be positive".into()));
        }
        Ok(())
    }
}

/// Fixation gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Time window considered (milliseconds)
    pub window_ms: u64,

    /// Minimum samples inside the window
    pub min_samples: usize,

    /// Window mean distance must stay below this fraction of the threshold
    pub mean_ratio: f64,

    /// Maximum standard deviation of window distances (px)
    pub max_std_dev: f64,

    /// A position step larger than this counts as a jump (px)
    pub jump_step_px: f64,

    /// Maximum fraction of steps that are jumps
    pub max_jump_ratio: f64,

    /// Allowed growth of mean distance from the first to the second half (px)
    pub trend_tolerance_px: f64,

    /// Most recent samples that must each be within threshold
    pub recent_count: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window_ms: 1500,
            min_samples: 5,
            mean_ratio: 0.8,
            max_std_dev: 25.0,
            jump_step_px: 30.0,
            max_jump_ratio: 0.2,
            trend_tolerance_px: 5.0,
            recent_count: 5,
        }
    }
}

impl GateConfig {
    /// Looser gate for noisy low-resolution cameras
    pub fn lenient() -> Self {
        Self {
            max_std_dev: 40.0,
            max_jump_ratio: 0.35,
            recent_count: 3,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.window_ms == 0 || self.min_samples == 0 || self.recent_count == 0 {
            return Err(FilterError::Config("gate window and sample counts must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.max_jump_ratio) {
            return Err(FilterError::OutOfRange {
                field: "max_jump_ratio",
                value: self.max_jump_ratio,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}
