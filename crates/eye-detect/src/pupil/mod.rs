//! Pupil detection
//!
//! Several independent candidate generators run over each eye region and the
//! most confident candidate wins. Methods are a tagged strategy, not separate
//! detectors, so they share region geometry and the confidence floor.

mod color_difference;
mod dark_circle;
mod edge;

use crate::config::PupilConfig;
use crate::DetectError;
use frame_input::{FaceRegion, Frame, PixelRect};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Candidate generator that produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    DarkCircle,
    EdgeContrast,
    ColorDifference,
}

/// Which eye, in image coordinates (image-left is the subject's right eye)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeSide {
    Left,
    Right,
}

/// Raw candidate from a single method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeCandidate {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub confidence: f64,
    pub method: DetectionMethod,
}

/// Fused per-eye detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeDetection {
    /// Pupil center in frame pixels
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub confidence: f64,
    pub detected: bool,
    pub method: Option<DetectionMethod>,
}

impl EyeDetection {
    /// No detection this frame
    pub fn missed() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            radius: 0.0,
            confidence: 0.0,
            detected: false,
            method: None,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Scale by `factor` into another coordinate space
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            radius: self.radius * factor,
            ..*self
        }
    }

    /// Detected with finite coordinates
    pub fn is_valid(&self) -> bool {
        self.detected && self.x.is_finite() && self.y.is_finite() && self.confidence.is_finite()
    }
}

impl Default for EyeDetection {
    fn default() -> Self {
        Self::missed()
    }
}

/// Detections and search regions for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyePair {
    pub left: EyeDetection,
    pub right: EyeDetection,
    pub left_region: PixelRect,
    pub right_region: PixelRect,
}

impl EyePair {
    pub fn eye(&self, side: EyeSide) -> &EyeDetection {
        match side {
            EyeSide::Left => &self.left,
            EyeSide::Right => &self.right,
        }
    }

    /// Scale detections and regions by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            left: self.left.scaled(factor),
            right: self.right.scaled(factor),
            left_region: self.left_region.scaled(factor),
            right_region: self.right_region.scaled(factor),
        }
    }

    pub fn detected_count(&self) -> usize {
        [self.left, self.right].iter().filter(|e| e.is_valid()).count()
    }

    /// Mean confidence over both eyes; a missed eye contributes zero
    pub fn mean_confidence(&self) -> f64 {
        let conf = |e: &EyeDetection| if e.is_valid() { e.confidence } else { 0.0 };
        (conf(&self.left) + conf(&self.right)) / 2.0
    }
}

/// Multi-method pupil detector
#[derive(Debug, Clone)]
pub struct PupilDetector {
    config: PupilConfig,
}

impl PupilDetector {
    pub fn new(config: PupilConfig) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PupilConfig {
        &self.config
    }

    /// Search regions for both eyes, clamped to the frame
    pub fn eye_regions(&self, face: &FaceRegion, frame_width: u32, frame_height: u32) -> [PixelRect; 2] {
        let (y0, y1) = self.config.eye_band;
        [self.config.left_eye, self.config.right_eye].map(|(x0, x1)| {
            let rect = face.fraction_rect(x0, x1, y0, y1).clamp_to(frame_width, frame_height);
            if self.config.partial_pupil {
                rect.lower_fraction(self.config.partial_fraction)
            } else {
                rect
            }
        })
    }

    /// Detect both pupils in a frame
    pub fn detect(&self, frame: &Frame, face: &FaceRegion) -> EyePair {
        let luma = frame.to_luma();
        self.detect_with_luma(frame.rgba(), &luma, face)
    }

    /// Detect with a precomputed grayscale image of the same frame
    pub fn detect_with_luma(&self, rgba: &RgbaImage, luma: &GrayImage, face: &FaceRegion) -> EyePair {
        let [left_region, right_region] = self.eye_regions(face, luma.width(), luma.height());
        EyePair {
            left: self.detect_eye(rgba, luma, left_region, EyeSide::Left),
            right: self.detect_eye(rgba, luma, right_region, EyeSide::Right),
            left_region,
            right_region,
        }
    }

    fn detect_eye(&self, rgba: &RgbaImage, luma: &GrayImage, region: PixelRect, side: EyeSide) -> EyeDetection {
        let min_side = 2 * self.config.max_radius + 1;
        if region.width < min_side || region.height < min_side {
            debug!("{:?} eye region {:?} too small for max radius, skipping", side, region);
            return EyeDetection::missed();
        }

        let candidates = self.candidates(rgba, luma, region);
        let best = candidates
            .into_iter()
            .filter(|c| c.x.is_finite() && c.y.is_finite() && c.confidence.is_finite())
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

        match best {
            Some(c) if c.confidence >= self.config.confidence_floor => {
                trace!(
                    "{:?} eye: ({:.1}, {:.1}) r={:.1} conf={:.2} via {:?}",
                    side,
                    c.x,
                    c.y,
                    c.radius,
                    c.confidence,
                    c.method
                );
                EyeDetection {
                    x: c.x,
                    y: c.y,
                    radius: c.radius.clamp(f64::from(self.config.min_radius), f64::from(self.config.max_radius)),
                    confidence: c.confidence.clamp(0.0, 1.0),
                    detected: true,
                    method: Some(c.method),
                }
            }
            Some(c) => {
                trace!("{:?} eye: best candidate {:.2} below floor", side, c.confidence);
                EyeDetection::missed()
            }
            None => EyeDetection::missed(),
        }
    }

    /// Run every enabled method over one eye region
    pub fn candidates(&self, rgba: &RgbaImage, luma: &GrayImage, region: PixelRect) -> Vec<EyeCandidate> {
        let methods = self.config.methods;
        let mut out = Vec::with_capacity(3);
        if methods.dark_circle {
            out.extend(dark_circle::scan(luma, region, &self.config));
        }
        if methods.edge_contrast {
            out.extend(edge::scan(luma, region, &self.config));
        }
        if methods.color_difference {
            out.extend(color_difference::scan(rgba, region, &self.config));
        }
        out
    }
}

impl Default for PupilDetector {
    fn default() -> Self {
        Self {
            config: PupilConfig::default(),
        }
    }
}

/// Luminance at a continuous coordinate (pixel `(x, y)` covers `[x, x+1)`)
fn sample(luma: &GrayImage, x: f64, y: f64) -> Option<f64> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    luma.get_pixel_checked(x as u32, y as u32).map(|p| f64::from(p.0[0]))
}

fn region_mean(luma: &GrayImage, rect: PixelRect) -> Option<f64> {
    let rect = rect.clamp_to(luma.width(), luma.height());
    if rect.area() == 0 {
        return None;
    }
    let mut sum = 0u64;
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            sum += u64::from(luma.get_pixel(x, y).0[0]);
        }
    }
    Some(sum as f64 / f64::from(rect.area()))
}

/// Adaptive dark threshold: the absolute bound, tightened in dim regions
fn dark_threshold(config: &PupilConfig, region_mean: f64) -> f64 {
    f64::from(config.dark_threshold).min(region_mean * config.dark_ratio)
}

/// Refine a grid-aligned center to the sub-pixel dark centroid.
///
/// Two passes with a window of twice the candidate radius, so a candidate
/// off-center by up to a grid step still sees the whole pupil.
fn refine_center(luma: &GrayImage, rect: PixelRect, cx: f64, cy: f64, radius: f64, threshold: f64) -> (f64, f64) {
    let window = radius * 2.0 + 2.0;
    let mut center = (cx, cy);
    for _ in 0..2 {
        match dark_centroid(luma, rect, center.0, center.1, window, threshold) {
            Some((x, y, _)) => center = (x, y),
            None => break,
        }
    }
    center
}

/// Centroid of dark pixels within `radius` of `(cx, cy)`, limited to `rect`.
///
/// Returns the sub-pixel centroid and the dark pixel count.
fn dark_centroid(luma: &GrayImage, rect: PixelRect, cx: f64, cy: f64, radius: f64, threshold: f64) -> Option<(f64, f64, usize)> {
    let rect = rect.clamp_to(luma.width(), luma.height());
    let x0 = (cx - radius).floor().max(f64::from(rect.x)) as u32;
    let y0 = (cy - radius).floor().max(f64::from(rect.y)) as u32;
    let x1 = ((cx + radius).ceil() as u32).min(rect.right());
    let y1 = ((cy + radius).ceil() as u32).min(rect.bottom());

    let mut count = 0usize;
    let (mut sx, mut sy) = (0.0, 0.0);
    for y in y0..y1 {
        for x in x0..x1 {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            if (px - cx).hypot(py - cy) > radius {
                continue;
            }
            if f64::from(luma.get_pixel(x, y).0[0]) < threshold {
                count += 1;
                sx += px;
                sy += py;
            }
        }
    }
    (count > 0).then(|| (sx / count as f64, sy / count as f64, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodSet;
    use frame_input::synthetic::FaceScene;
    use proptest::prelude::*;

    fn assert_near(found: &EyeDetection, expected: (f64, f64), tol: f64) {
        assert!(found.detected, "eye not detected");
        assert!(
            (found.x - expected.0).abs() < tol && (found.y - expected.1).abs() < tol,
            "found ({:.2}, {:.2}), expected ({:.2}, {:.2})",
            found.x,
            found.y,
            expected.0,
            expected.1
        );
    }

    #[test]
    fn test_detects_centered_pupils() {
        let scene = FaceScene::default();
        let frame = scene.render(0);
        let pair = PupilDetector::default().detect(&frame, &scene.face_region());
        let [left, right] = scene.pupil_centers();
        assert_near(&pair.left, left, 1.0);
        assert_near(&pair.right, right, 1.0);
        assert_eq!(pair.detected_count(), 2);
        assert!(pair.mean_confidence() > 0.8);
    }

    #[test]
    fn test_tracks_gaze_shift() {
        let scene = FaceScene::default().with_gaze(0.8, 0.5);
        let frame = scene.render(0);
        let pair = PupilDetector::default().detect(&frame, &scene.face_region());
        let [left, right] = scene.pupil_centers();
        assert_near(&pair.left, left, 1.0);
        assert_near(&pair.right, right, 1.0);
    }

    #[test]
    fn test_each_method_alone() {
        let scene = FaceScene::default().with_gaze(-0.5, 0.0);
        let frame = scene.render(0);
        let luma = frame.to_luma();
        let only = [
            (MethodSet { dark_circle: true, edge_contrast: false, color_difference: false }, DetectionMethod::DarkCircle),
            (MethodSet { dark_circle: false, edge_contrast: true, color_difference: false }, DetectionMethod::EdgeContrast),
            (MethodSet { dark_circle: false, edge_contrast: false, color_difference: true }, DetectionMethod::ColorDifference),
        ];
        for (methods, expected) in only {
            let detector = PupilDetector::new(PupilConfig { methods, ..Default::default() }).unwrap();
            let pair = detector.detect_with_luma(frame.rgba(), &luma, &scene.face_region());
            assert_eq!(pair.left.method, Some(expected));
            assert_near(&pair.left, scene.pupil_centers()[0], 1.5);
        }
    }

    #[test]
    fn test_closed_eyes_not_detected() {
        let mut scene = FaceScene::default();
        scene.eyelid_cover = 1.0;
        let frame = scene.render(0);
        let pair = PupilDetector::default().detect(&frame, &scene.face_region());
        assert!(!pair.left.detected);
        assert!(!pair.right.detected);
        assert_eq!(pair.mean_confidence(), 0.0);
        assert_eq!(pair.detected_count(), 0);
    }

    #[test]
    fn test_partial_mode_with_eyelid() {
        let mut scene = FaceScene::default().with_gaze(0.0, 0.6);
        scene.eyelid_cover = 0.3;
        let frame = scene.render(0);
        let detector = PupilDetector::new(PupilConfig::partial()).unwrap();
        let regions = detector.eye_regions(&scene.face_region(), frame.width(), frame.height());
        let full = PupilDetector::default().eye_regions(&scene.face_region(), frame.width(), frame.height());
        assert!(regions[0].y > full[0].y);
        assert_eq!(regions[0].bottom(), full[0].bottom());

        let pair = detector.detect(&frame, &scene.face_region());
        assert!(pair.left.detected);
        assert!(pair.left.radius >= 3.0 && pair.left.radius <= 12.0);
    }

    #[test]
    fn test_small_face_skips_eyes() {
        let scene = FaceScene::new(80, 60);
        let frame = scene.render(0);
        let pair = PupilDetector::default().detect(&frame, &scene.face_region());
        assert_eq!(pair.left, EyeDetection::missed());
        assert_eq!(pair.right, EyeDetection::missed());
    }

    #[test]
    fn test_missed_eye_halves_confidence() {
        let eye = |x: f64, confidence: f64| EyeDetection {
            x,
            y: 10.0,
            radius: 5.0,
            confidence,
            detected: true,
            method: Some(DetectionMethod::DarkCircle),
        };
        let pair = EyePair {
            left: eye(0.0, 0.25),
            right: eye(100.0, 0.75),
            left_region: PixelRect::default(),
            right_region: PixelRect::default(),
        };
        assert_eq!(pair.mean_confidence(), 0.5);

        let one_eye = EyePair { right: EyeDetection::missed(), ..pair };
        assert_eq!(one_eye.mean_confidence(), 0.125);
        assert_eq!(one_eye.detected_count(), 1);
        assert_eq!(one_eye.eye(EyeSide::Left).x, 0.0);

        let doubled = pair.scaled(2.0);
        assert_eq!(doubled.right.position(), (200.0, 20.0));
        assert_eq!(doubled.right.radius, 10.0);
        assert_eq!(doubled.right.confidence, 0.75);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PupilConfig {
            min_radius: 10,
            max_radius: 4,
            ..Default::default()
        };
        assert!(matches!(PupilDetector::new(config), Err(DetectError::Config(_))));
        assert!(PupilDetector::new(PupilConfig::partial()).is_ok());
    }

    proptest! {
        #[test]
        fn test_eye_regions_stay_in_frame(
            x in -200.0f64..700.0,
            y in -200.0f64..500.0,
            width in 1.0f64..500.0,
            height in 1.0f64..500.0,
            partial in any::<bool>(),
        ) {
            let config = if partial { PupilConfig::partial() } else { PupilConfig::default() };
            let detector = PupilDetector::new(config).unwrap();
            let face = FaceRegion::new(x, y, width, height, 1.0);
            for region in detector.eye_regions(&face, 640, 480) {
                prop_assert!(region.right() <= 640);
                prop_assert!(region.bottom() <= 480);
            }
        }
    }
}
