//! Detector configuration

use crate::DetectError;
use serde::{Deserialize, Serialize};

/// Combined detector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub face: FaceEstimatorConfig,
    pub pupil: PupilConfig,
    pub pose: PoseConfig,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        self.face.validate()?;
        self.pupil.validate()?;
        Ok(())
    }
}

/// Skin-tone face estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceEstimatorConfig {
    /// Sample every Nth pixel in both directions
    pub stride: u32,

    /// Minimum skin pixels as a fraction of sampled pixels
    pub min_skin_fraction: f64,

    /// Skin fraction that maps to confidence 1.0
    pub full_confidence_fraction: f64,

    /// Estimated face size as a fraction of frame width/height
    pub width_ratio: f64,
    pub height_ratio: f64,
}

impl Default for FaceEstimatorConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            min_skin_fraction: 0.05,
            full_confidence_fraction: 0.25,
            width_ratio: 0.4,
            height_ratio: 0.55,
        }
    }
}

impl FaceEstimatorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.stride == 0 {
            return Err(DetectError::Config("face stride must be at least 1".into()));
        }
        if self.full_confidence_fraction <= 0.0 {
            return Err(DetectError::Config("full_confidence_fraction must be positive".into()));
        }
        Ok(())
    }
}

/// Which candidate generators run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodSet {
    pub dark_circle: bool,
    pub edge_contrast: bool,
    pub color_difference: bool,
}

impl Default for MethodSet {
    fn default() -> Self {
        Self {
            dark_circle: true,
            edge_contrast: true,
            color_difference: true,
        }
    }
}

/// Pupil detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PupilConfig {
    /// Pupil radius search range (pixels)
    pub min_radius: u32,
    pub max_radius: u32,
    pub radius_step: u32,

    /// Candidate center grid spacing (pixels)
    pub center_step: u32,

    /// Samples taken on each candidate circle
    pub circle_samples: usize,

    /// Absolute luminance below which a pixel counts as dark
    pub dark_threshold: u8,

    /// Relative dark threshold (fraction of the eye region mean)
    pub dark_ratio: f64,

    /// Candidates below this confidence are rejected
    pub confidence_floor: f64,

    /// Scale applied to normalized ring contrast
    pub contrast_gain: f64,

    /// HSV mask bounds for the color-difference method
    pub color_max_value: f64,
    pub color_max_saturation: f64,

    /// Search only the lower part of each eye region
    pub partial_pupil: bool,
    pub partial_fraction: f64,

    /// Eye band (fractions of face height)
    pub eye_band: (f64, f64),
    /// Horizontal eye spans (fractions of face width)
    pub left_eye: (f64, f64),
    pub right_eye: (f64, f64),

    pub methods: MethodSet,
}

impl Default for PupilConfig {
    fn default() -> Self {
        Self {
            min_radius: 3,
            max_radius: 12,
            radius_step: 2,
            center_step: 2,
            circle_samples: 16,
            dark_threshold: 70,
            dark_ratio: 0.6,
            confidence_floor: 0.3,
            contrast_gain: 1.0,
            color_max_value: 0.3,
            color_max_saturation: 0.35,
            partial_pupil: false,
            partial_fraction: 0.7,
            eye_band: (0.25, 0.45),
            left_eye: (0.15, 0.40),
            right_eye: (0.60, 0.85),
            methods: MethodSet::default(),
        }
    }
}

impl PupilConfig {
    /// Profile for cameras mounted below the screen (upper eyelid occludes the pupil)
    pub fn partial() -> Self {
        Self {
            partial_pupil: true,
            ..Default::default()
        }
    }

    /// Cheaper profile for slow machines: coarser grid, dark-circle only
    pub fn fast() -> Self {
        Self {
            center_step: 3,
            circle_samples: 12,
            methods: MethodSet {
                dark_circle: true,
                edge_contrast: false,
                color_difference: false,
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.min_radius == 0 || self.min_radius > self.max_radius {
            return Err(DetectError::Config(format!(
                "invalid pupil radius range {}..={}",
                self.min_radius, self.max_radius
            )));
        }
        if self.radius_step == 0 || self.center_step == 0 {
            return Err(DetectError::Config("search steps must be at least 1".into()));
        }
        if self.circle_samples < 4 {
            return Err(DetectError::Config("circle_samples must be at least 4".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(DetectError::Config("confidence_floor must be within 0..=1".into()));
        }
        if !(self.partial_fraction > 0.0 && self.partial_fraction <= 1.0) {
            return Err(DetectError::Config("partial_fraction must be within (0, 1]".into()));
        }
        let spans = [self.eye_band, self.left_eye, self.right_eye];
        if spans.iter().any(|(a, b)| !(0.0..1.0).contains(a) || b <= a || *b > 1.0) {
            return Err(DetectError::Config("eye region fractions must satisfy 0 <= start < end <= 1".into()));
        }
        Ok(())
    }
}

/// Head pose approximation gains
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Degrees of yaw per unit of horizontal eye-midpoint offset (fraction of face width)
    pub yaw_gain_deg: f64,
    /// Degrees of pitch per unit of vertical offset (fraction of face height)
    pub pitch_gain_deg: f64,
    /// Expected eye line at rest (fraction of face height)
    pub eye_line: f64,
    /// Both eyes need at least this confidence
    pub min_eye_confidence: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            yaw_gain_deg: 90.0,
            pitch_gain_deg: 90.0,
            eye_line: 0.35,
            min_eye_confidence: 0.3,
        }
    }
}
