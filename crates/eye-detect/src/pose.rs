//! Head pose approximation from face and eye geometry

use crate::config::PoseConfig;
use crate::pupil::EyePair;
use frame_input::{FaceRegion, HeadPose};

/// Approximates yaw, pitch and roll when the host supplies no tracker pose.
///
/// Yaw is positive when the eye midpoint sits right of the face center,
/// pitch positive when the eyes sit above the resting eye line, roll is the
/// eye-line angle (positive when the right eye is lower).
#[derive(Debug, Clone, Default)]
pub struct PoseEstimator {
    config: PoseConfig,
}

impl PoseEstimator {
    pub fn new(config: PoseConfig) -> Self {
        Self { config }
    }

    /// Needs both eyes detected with at least `min_eye_confidence`
    pub fn estimate(&self, face: &FaceRegion, eyes: &EyePair) -> Option<HeadPose> {
        let usable = |e: &crate::EyeDetection| e.is_valid() && e.confidence >= self.config.min_eye_confidence;
        if !usable(&eyes.left) || !usable(&eyes.right) || face.width <= 0.0 || face.height <= 0.0 {
            return None;
        }

        let mid_x = (eyes.left.x + eyes.right.x) / 2.0;
        let mid_y = (eyes.left.y + eyes.right.y) / 2.0;
        let (face_cx, _) = face.center();
        let rest_y = face.y + face.height * self.config.eye_line;

        let yaw = (mid_x - face_cx) / face.width * self.config.yaw_gain_deg;
        let pitch = (rest_y - mid_y) / face.height * self.config.pitch_gain_deg;
        let roll = (eyes.right.y - eyes.left.y).atan2(eyes.right.x - eyes.left.x).to_degrees();

        let pose = HeadPose::new(yaw, pitch, roll);
        pose.is_finite().then_some(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pupil::{DetectionMethod, EyeDetection};
    use frame_input::PixelRect;

    fn eyes(left: (f64, f64), right: (f64, f64)) -> EyePair {
        let eye = |(x, y): (f64, f64)| EyeDetection {
            x,
            y,
            radius: 5.0,
            confidence: 0.9,
            detected: true,
            method: Some(DetectionMethod::DarkCircle),
        };
        EyePair {
            left: eye(left),
            right: eye(right),
            left_region: PixelRect::default(),
            right_region: PixelRect::default(),
        }
    }

    #[test]
    fn test_neutral_pose() {
        let face = FaceRegion::new(0.0, 0.0, 200.0, 200.0, 1.0);
        let pose = PoseEstimator::default().estimate(&face, &eyes((55.0, 70.0), (145.0, 70.0))).unwrap();
        assert!(pose.yaw.abs() < 1e-9);
        assert!(pose.pitch.abs() < 1e-9);
        assert!(pose.roll.abs() < 1e-9);
    }

    #[test]
    fn test_yaw_and_pitch_signs() {
        let face = FaceRegion::new(0.0, 0.0, 200.0, 200.0, 1.0);
        // Eyes shifted 20px right and 10px up
        let pose = PoseEstimator::default().estimate(&face, &eyes((75.0, 60.0), (165.0, 60.0))).unwrap();
        assert!((pose.yaw - 9.0).abs() < 1e-9);
        assert!((pose.pitch - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_roll_from_eye_line() {
        let face = FaceRegion::new(0.0, 0.0, 200.0, 200.0, 1.0);
        let pose = PoseEstimator::default().estimate(&face, &eyes((50.0, 50.0), (150.0, 150.0))).unwrap();
        assert!((pose.roll - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_requires_both_eyes() {
        let face = FaceRegion::new(0.0, 0.0, 200.0, 200.0, 1.0);
        let mut pair = eyes((55.0, 70.0), (145.0, 70.0));
        pair.right = EyeDetection::missed();
        assert!(PoseEstimator::default().estimate(&face, &pair).is_none());
    }
}
