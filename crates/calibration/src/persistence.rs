//! Versioned calibration profiles
//!
//! The host owns storage; this module only turns a fitted calibration into
//! bytes (postcard) or JSON and back.

use crate::accuracy::CalibrationAccuracy;
use crate::error::CalibrationError;
use crate::transform::CalibrationTransform;
use serde::{Deserialize, Serialize};

/// Current profile layout version
pub const PROFILE_VERSION: u32 = 1;

/// Saved calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Must stay the first field: decoders read it before the rest
    pub version: u32,
    pub transform: CalibrationTransform,
    pub accuracy: CalibrationAccuracy,
    pub created_at_ms: u64,
    pub point_count: usize,
}

impl CalibrationProfile {
    pub fn new(transform: CalibrationTransform, accuracy: CalibrationAccuracy, created_at_ms: u64, point_count: usize) -> Self {
        Self {
            version: PROFILE_VERSION,
            transform,
            accuracy,
            created_at_ms,
            point_count,
        }
    }

    /// Compact binary encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, CalibrationError> {
        postcard::to_allocvec(self).map_err(|e| CalibrationError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CalibrationError> {
        let (version, _) = postcard::take_from_bytes::<u32>(bytes).map_err(|e| CalibrationError::Decode(e.to_string()))?;
        check_version(version)?;
        postcard::from_bytes(bytes).map_err(|e| CalibrationError::Decode(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CalibrationError> {
        serde_json::to_string_pretty(self).map_err(|e| CalibrationError::Encode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CalibrationError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| CalibrationError::Decode(e.to_string()))?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CalibrationError::Decode("missing profile version".into()))?;
        check_version(u32::try_from(version).unwrap_or(u32::MAX))?;
        serde_json::from_value(value).map_err(|e| CalibrationError::Decode(e.to_string()))
    }
}

fn check_version(found: u32) -> Result<(), CalibrationError> {
    if found == PROFILE_VERSION {
        Ok(())
    } else {
        Err(CalibrationError::UnsupportedVersion {
            found,
            expected: PROFILE_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CalibrationProfile {
        let transform = CalibrationTransform {
            scale_x: 7.5,
            scale_y: 12.0,
            offset_x: -3.25,
            offset_y: -3.75,
            quadrant_correction: [(0.0078125, 0.0), (0.0, -0.015625), (0.0, 0.0), (0.00390625, 0.00390625)],
            ..CalibrationTransform::identity()
        };
        let accuracy = CalibrationAccuracy {
            overall: 0.875,
            horizontal: 0.9375,
            vertical: 0.8125,
            stability: 0.96875,
        };
        CalibrationProfile::new(transform, accuracy, 1_700_000_000_000, 9)
    }

    #[test]
    fn test_binary_reload() {
        let original = profile();
        let bytes = original.to_bytes().unwrap();
        assert_eq!(CalibrationProfile::from_bytes(&bytes).unwrap(), original);
    }

    #[test]
    fn test_json_reload() {
        let original = profile();
        let json = original.to_json().unwrap();
        assert!(json.contains("\"version\": 1"));
        assert_eq!(CalibrationProfile::from_json(&json).unwrap(), original);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut future = profile();
        future.version = 2;
        let bytes = postcard::to_allocvec(&future).unwrap();
        assert_eq!(
            CalibrationProfile::from_bytes(&bytes),
            Err(CalibrationError::UnsupportedVersion { found: 2, expected: 1 })
        );

        let json = serde_json::to_string(&future).unwrap();
        assert!(matches!(
            CalibrationProfile::from_json(&json),
            Err(CalibrationError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(CalibrationProfile::from_bytes(&[]), Err(CalibrationError::Decode(_))));
        assert!(matches!(CalibrationProfile::from_json("{}"), Err(CalibrationError::Decode(_))));
    }
}
