//! Selection configuration

use crate::SelectionError;
use serde::{Deserialize, Serialize};

/// Dwell selector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Continuous hover time needed to commit (milliseconds)
    pub dwell_ms: u64,
    /// Quiet period after a commit before a new dwell can start (milliseconds)
    pub cooldown_ms: u64,
    /// Gaze below this confidence counts as no gaze
    pub min_confidence: f64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 1000,
            cooldown_ms: 0,
            min_confidence: 0.0,
        }
    }
}

impl DwellConfig {
    /// Quicker selection, more accidental commits
    pub fn fast() -> Self {
        Self {
            dwell_ms: 600,
            ..Default::default()
        }
    }

    /// Slower selection for unsteady gaze
    pub fn precise() -> Self {
        Self {
            dwell_ms: 1500,
            cooldown_ms: 500,
            min_confidence: 0.3,
        }
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.dwell_ms == 0 {
            return Err(SelectionError::Config("dwell_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SelectionError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Zone selector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Cells per side; only 3 is supported
    pub grid_size: usize,
    pub dwell_ms: u64,
    pub cooldown_ms: u64,
    /// |yaw| above this picks the left or right column (degrees)
    pub yaw_threshold_deg: f64,
    /// |pitch| above this picks the top or bottom row (degrees)
    pub pitch_threshold_deg: f64,
    /// Mirror yaw for front cameras that flip the image
    pub invert_yaw: bool,
    pub invert_pitch: bool,
    /// Extra angle needed to leave the current zone; 0 disables the band
    pub hysteresis_deg: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            grid_size: 3,
            dwell_ms: 1000,
            cooldown_ms: 0,
            yaw_threshold_deg: 8.0,
            pitch_threshold_deg: 6.0,
            invert_yaw: false,
            invert_pitch: false,
            hysteresis_deg: 0.0,
        }
    }
}

impl ZoneConfig {
    /// Default thresholds with a 2 degree hysteresis band
    pub fn steady() -> Self {
        Self {
            hysteresis_deg: 2.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.grid_size != 3 {
            return Err(SelectionError::InvalidGridSize(self.grid_size));
        }
        if self.dwell_ms == 0 {
            return Err(SelectionError::Config("dwell_ms must be positive".into()));
        }
        if self.yaw_threshold_deg <= 0.0 || self.pitch_threshold_deg <= 0.0 {
            return Err(SelectionError::Config("zone thresholds must be positive".into()));
        }
        if self.hysteresis_deg < 0.0
            || self.hysteresis_deg >= self.yaw_threshold_deg
            || self.hysteresis_deg >= self.pitch_threshold_deg
        {
            return Err(SelectionError::Config(format!(
                "hysteresis_deg {} must be non-negative and below both thresholds",
                self.hysteresis_deg
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(DwellConfig::default().validate().is_ok());
        assert!(DwellConfig::fast().validate().is_ok());
        assert!(DwellConfig::precise().validate().is_ok());
        assert!(ZoneConfig::default().validate().is_ok());
        assert!(ZoneConfig::steady().validate().is_ok());
    }

    #[test]
    fn test_grid_size_rejected() {
        let config = ZoneConfig {
            grid_size: 4,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SelectionError::InvalidGridSize(4)));
    }

    #[test]
    fn test_hysteresis_bounds() {
        let config = ZoneConfig {
            hysteresis_deg: 6.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SelectionError::Config(_))));
    }
}
