//! Pipeline configuration
//!
//! Layered: built-in defaults, then an optional TOML/JSON file, then
//! environment variables such as `GAZE__DWELL__DWELL_MS=1200`.

use calibration::CalibrationConfig;
use eye_detect::DetectorConfig;
use gaze_filter::StabilizerConfig;
use selection::{DwellConfig, ZoneConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GAZE";

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which selector consumes gaze outside calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Continuous dwell over screen targets
    #[default]
    Dwell,
    /// 3x3 zones from head pose
    Zone,
}

/// Raw-to-screen mapping used until a calibration is available.
///
/// `screen = viewport · clamp01(0.5 + (raw − center) · gain)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionalMapping {
    /// Raw point of a straight-ahead gaze
    pub center: (f64, f64),
    pub gain: (f64, f64),
}

impl Default for ProvisionalMapping {
    fn default() -> Self {
        Self {
            center: (0.5, 0.35),
            gain: (7.5, 22.5),
        }
    }
}

impl ProvisionalMapping {
    /// Normalized screen point for a raw point
    pub fn apply(&self, raw: (f64, f64)) -> (f64, f64) {
        (
            (0.5 + (raw.0 - self.center.0) * self.gain.0).clamp(0.0, 1.0),
            (0.5 + (raw.1 - self.center.1) * self.gain.1).clamp(0.0, 1.0),
        )
    }
}

/// Adaptive working-resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub enabled: bool,
    /// Processing time budget per frame (milliseconds)
    pub frame_budget_ms: f64,
    /// Largest downscale factor
    pub max_scale: u32,
    /// Consecutive over-budget frames before the scale doubles
    pub over_budget_frames: u32,
    /// Consecutive frames under half the budget before the scale halves
    pub under_budget_frames: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_budget_ms: 33.0,
            max_scale: 4,
            over_budget_frames: 3,
            under_budget_frames: 30,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub stabilizer: StabilizerConfig,
    pub calibration: CalibrationConfig,
    pub dwell: DwellConfig,
    pub zone: ZoneConfig,
    pub mode: SelectionMode,
    pub provisional: ProvisionalMapping,
    pub resolution: ResolutionConfig,

    /// Eye confidence below this is reported and treated as a miss
    pub min_detection_confidence: f64,

    /// Emit a `DebugFrame` with every result
    pub debug_frames: bool,
}

impl PipelineConfig {
    /// Load defaults, an optional file and `GAZE__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults =
            config::Config::try_from(&PipelineConfig::default()).map_err(|e| ConfigError::Load(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            info!("Loading pipeline configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: PipelineConfig = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: &dyn std::fmt::Display| ConfigError::Invalid(e.to_string());
        self.detector.validate().map_err(|e| invalid(&e))?;
        self.stabilizer.validate().map_err(|e| invalid(&e))?;
        self.calibration.validate().map_err(|e| invalid(&e))?;
        self.dwell.validate().map_err(|e| invalid(&e))?;
        self.zone.validate().map_err(|e| invalid(&e))?;
        if self.resolution.max_scale == 0 || self.resolution.frame_budget_ms <= 0.0 {
            return Err(ConfigError::Invalid(
                "resolution max_scale and frame_budget_ms must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_detection_confidence must be within [0, 1], got {}",
                self.min_detection_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_provisional_mapping() {
        let mapping = ProvisionalMapping::default();
        assert_eq!(mapping.apply((0.5, 0.35)), (0.5, 0.5));
        let (x, _) = mapping.apply((0.5 + 0.4 / 7.5, 0.35));
        assert!((x - 0.9).abs() < 1e-9);
        assert_eq!(mapping.apply((5.0, -5.0)), (1.0, 0.0));
    }

    #[test]
    fn test_load_file_overrides() {
        let path = std::env::temp_dir().join(format!("gaze-pipeline-{}.toml", std::process::id()));
        fs::write(
            &path,
            "mode = \"Zone\"\n\n[zone]\nyaw_threshold_deg = 10.0\n\n[calibration]\nmode = \"Quick5\"\n",
        )
        .unwrap();

        let loaded = PipelineConfig::load(Some(&path));
        fs::remove_file(&path).ok();
        let config = loaded.unwrap();
        assert_eq!(config.mode, SelectionMode::Zone);
        assert_eq!(config.zone.yaw_threshold_deg, 10.0);
        assert_eq!(config.zone.pitch_threshold_deg, 6.0);
        assert_eq!(config.calibration.mode, calibration::CalibrationMode::Quick5);
        assert_eq!(config.stabilizer.history_size, 10);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("GAZE__DWELL__DWELL_MS", "1200");
        let loaded = PipelineConfig::load(None);
        std::env::remove_var("GAZE__DWELL__DWELL_MS");
        assert_eq!(loaded.unwrap().dwell.dwell_ms, 1200);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = PipelineConfig {
            min_detection_confidence: 2.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = PipelineConfig::default();
        config.zone.grid_size = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
