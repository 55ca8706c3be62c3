//! Face region estimation

use crate::color::is_skin;
use crate::config::FaceEstimatorConfig;
use frame_input::{FaceRegion, Frame};
use tracing::{debug, trace};

/// Estimates the face region of a frame.
///
/// An externally supplied face box wins; otherwise the region is derived from
/// skin-tone pixel statistics.
#[derive(Debug, Clone)]
pub struct FaceRegionEstimator {
    config: FaceEstimatorConfig,
}

impl FaceRegionEstimator {
    pub fn new(config: FaceEstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FaceEstimatorConfig {
        &self.config
    }

    /// Face region for this frame, or `None` when no face is found
    pub fn estimate(&self, frame: &Frame) -> Option<FaceRegion> {
        match frame.face_box {
            Some(external) => {
                let clamped = external.clamp_to(frame.width(), frame.height());
                if clamped.is_none() {
                    debug!("External face box {:?} lies outside the frame", external);
                }
                clamped
            }
            None => self.estimate_from_skin(frame),
        }
    }

    /// Skin-tone fallback
    pub fn estimate_from_skin(&self, frame: &Frame) -> Option<FaceRegion> {
        let stride = self.config.stride.max(1) as usize;
        let image = frame.rgba();

        let mut sampled = 0u64;
        let mut skin = 0u64;
        let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);

        for y in (0..frame.height()).step_by(stride) {
            for x in (0..frame.width()).step_by(stride) {
                sampled += 1;
                let [r, g, b, _] = image.get_pixel(x, y).0;
                if is_skin(r, g, b) {
                    skin += 1;
                    sum_x += f64::from(x);
                    sum_y += f64::from(y);
                }
            }
        }

        if sampled == 0 {
            return None;
        }
        let fraction = skin as f64 / sampled as f64;
        if skin == 0 || fraction < self.config.min_skin_fraction {
            trace!("Skin fraction {:.3} below minimum", fraction);
            return None;
        }

        let cx = sum_x / skin as f64;
        let cy = sum_y / skin as f64;
        let width = f64::from(frame.width()) * self.config.width_ratio;
        let height = f64::from(frame.height()) * self.config.height_ratio;
        let confidence = (fraction / self.config.full_confidence_fraction).min(1.0);

        let region = FaceRegion::new(cx - width / 2.0, cy - height / 2.0, width, height, confidence);
        let clamped = region.clamp_to(frame.width(), frame.height());
        debug!(
            "Skin face estimate: center=({:.1}, {:.1}) fraction={:.3} confidence={:.2}",
            cx, cy, fraction, confidence
        );
        clamped
    }
}

impl Default for FaceRegionEstimator {
    fn default() -> Self {
        Self::new(FaceEstimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_input::synthetic::{blank, FaceScene};

    #[test]
    fn test_external_box_passthrough() {
        let frame = blank(320, 240, [0, 0, 0], 0).with_face_box(FaceRegion::new(10.0, 20.0, 100.0, 120.0, 0.42));
        let face = FaceRegionEstimator::default().estimate(&frame).unwrap();
        assert_eq!((face.x, face.y, face.width, face.height), (10.0, 20.0, 100.0, 120.0));
        assert_eq!(face.confidence, 0.42);
    }

    #[test]
    fn test_external_box_outside_frame() {
        let frame = blank(320, 240, [0, 0, 0], 0).with_face_box(FaceRegion::new(400.0, 20.0, 50.0, 50.0, 0.9));
        assert!(FaceRegionEstimator::default().estimate(&frame).is_none());
    }

    #[test]
    fn test_skin_fallback_finds_face() {
        let scene = FaceScene::default();
        let frame = scene.render(0);
        let face = FaceRegionEstimator::default().estimate(&frame).unwrap();
        let (ex, ey) = scene.face_region().center();
        let (cx, cy) = face.center();
        assert!((cx - ex).abs() < 6.0, "cx={} expected {}", cx, ex);
        assert!((cy - ey).abs() < 6.0, "cy={} expected {}", cy, ey);
        // Face ellipse covers about a sixth of the frame
        assert!(face.confidence > 0.5 && face.confidence < 0.8);
    }

    #[test]
    fn test_no_skin_returns_none() {
        let frame = blank(320, 240, [40, 60, 90], 0);
        assert!(FaceRegionEstimator::default().estimate(&frame).is_none());
    }

    #[test]
    fn test_off_center_face_is_clamped() {
        let scene = FaceScene::default().with_face_center(0.2, 0.5);
        let frame = scene.render(0);
        let face = FaceRegionEstimator::default().estimate(&frame).unwrap();
        assert!(face.x >= 0.0);
        assert!(face.x + face.width <= 640.0);
    }
}
