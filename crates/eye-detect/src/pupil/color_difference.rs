//! Color-difference method
//!
//! Pupils are the only low-saturation, low-value blob inside the eye region.
//! Masks those pixels in HSV and treats the mask as a disk.

use super::{DetectionMethod, EyeCandidate};
use crate::color::rgb_to_hsv;
use crate::config::PupilConfig;
use frame_input::PixelRect;
use image::RgbaImage;
use std::f64::consts::PI;

/// Upper bound on confidence; a mask carries no shape evidence beyond compactness
const MAX_CONFIDENCE: f64 = 0.85;

pub(crate) fn scan(rgba: &RgbaImage, rect: PixelRect, config: &PupilConfig) -> Option<EyeCandidate> {
    let rect = rect.clamp_to(rgba.width(), rgba.height());
    let mut count = 0usize;
    let (mut sx, mut sy, mut sxx, mut syy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let [r, g, b, _] = rgba.get_pixel(x, y).0;
            let (_, saturation, value) = rgb_to_hsv(r, g, b);
            if value < config.color_max_value && saturation < config.color_max_saturation {
                let fx = f64::from(x) + 0.5;
                let fy = f64::from(y) + 0.5;
                count += 1;
                sx += fx;
                sy += fy;
                sxx += fx * fx;
                syy += fy * fy;
            }
        }
    }

    let min_r = f64::from(config.min_radius);
    if (count as f64) < PI * min_r * min_r * 0.5 {
        return None;
    }

    let n = count as f64;
    let (mx, my) = (sx / n, sy / n);
    let spread = (sxx / n - mx * mx).max(0.0) + (syy / n - my * my).max(0.0);
    // A uniform disk of radius R has var_x + var_y = R^2 / 2
    let radius = (2.0 * spread).sqrt();
    if radius <= 0.0 {
        return None;
    }
    let compactness = (n / (PI * radius * radius)).min(1.0);

    let max_r = f64::from(config.max_radius);
    let mut confidence = MAX_CONFIDENCE * compactness;
    if radius > max_r * 1.5 {
        // Hair, brows or shadow rather than a pupil
        confidence *= 0.5;
    }

    Some(EyeCandidate {
        x: mx,
        y: my,
        radius: radius.clamp(min_r, max_r),
        confidence,
        method: DetectionMethod::ColorDifference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn scene(blobs: &[(f64, f64, f64)]) -> RgbaImage {
        RgbaImage::from_fn(60, 50, |x, y| {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            if blobs.iter().any(|(cx, cy, r)| (px - cx).hypot(py - cy) <= *r) {
                Rgba([25, 22, 20, 255])
            } else {
                Rgba([235, 235, 235, 255])
            }
        })
    }

    #[test]
    fn test_single_disk() {
        let image = scene(&[(30.0, 22.0, 6.0)]);
        let found = scan(&image, PixelRect::new(0, 0, 60, 50), &PupilConfig::default()).unwrap();
        assert!((found.x - 30.0).abs() < 0.1);
        assert!((found.y - 22.0).abs() < 0.1);
        assert!((found.radius - 6.0).abs() < 0.5);
        assert!(found.confidence > 0.7);
    }

    #[test]
    fn test_split_mask_is_not_compact() {
        let image = scene(&[(12.0, 22.0, 5.0), (48.0, 22.0, 5.0)]);
        let found = scan(&image, PixelRect::new(0, 0, 60, 50), &PupilConfig::default()).unwrap();
        assert!(found.confidence < 0.3);
    }

    #[test]
    fn test_no_dark_pixels() {
        let image = scene(&[]);
        assert!(scan(&image, PixelRect::new(0, 0, 60, 50), &PupilConfig::default()).is_none());
    }
}
