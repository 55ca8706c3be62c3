//! Edge-contrast method
//!
//! A pupil is a dark core surrounded by a much brighter ring (iris edge and
//! sclera). Scores the luminance step between inner samples and an outer
//! ring three pixels outside the candidate radius.

use super::{dark_threshold, refine_center, region_mean, sample, DetectionMethod, EyeCandidate};
use crate::config::PupilConfig;
use frame_input::PixelRect;
use image::GrayImage;
use std::f64::consts::TAU;

const RING_OFFSET: u32 = 3;
const INNER_SAMPLES: usize = 8;

pub(crate) fn scan(luma: &GrayImage, rect: PixelRect, config: &PupilConfig) -> Option<EyeCandidate> {
    let mean = region_mean(luma, rect)?;
    let threshold = dark_threshold(config, mean);
    // Coarser grid than the dark-circle scan
    let step = (config.center_step.max(1) * 2) as usize;

    let mut best: Option<(f64, f64, u32, f64)> = None;
    for radius in (config.min_radius..=config.max_radius).step_by(config.radius_step.max(1) as usize) {
        let margin = radius + RING_OFFSET;
        if rect.width < 2 * margin + 1 || rect.height < 2 * margin + 1 {
            break;
        }
        for py in (rect.y + margin..rect.bottom() - margin).step_by(step) {
            for px in (rect.x + margin..rect.right() - margin).step_by(step) {
                let cx = f64::from(px) + 0.5;
                let cy = f64::from(py) + 0.5;
                let r = f64::from(radius);

                let Some(inner) = ring_mean(luma, cx, cy, r * 0.5, INNER_SAMPLES, true) else {
                    continue;
                };
                if inner >= threshold {
                    continue;
                }
                let Some(outer) = ring_mean(luma, cx, cy, r + f64::from(RING_OFFSET), config.circle_samples, false) else {
                    continue;
                };
                let contrast = ((outer - inner) / 255.0 * config.contrast_gain).clamp(0.0, 1.0);
                if best.map_or(true, |(_, _, _, c)| contrast > c) {
                    best = Some((cx, cy, radius, contrast));
                }
            }
        }
    }

    let (cx, cy, radius, contrast) = best?;
    let r = f64::from(radius);
    let (x, y) = refine_center(luma, rect, cx, cy, r, threshold);
    Some(EyeCandidate {
        x,
        y,
        radius: r,
        confidence: contrast,
        method: DetectionMethod::EdgeContrast,
    })
}

fn ring_mean(luma: &GrayImage, cx: f64, cy: f64, radius: f64, samples: usize, with_center: bool) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    if with_center {
        if let Some(v) = sample(luma, cx, cy) {
            sum += v;
            n += 1;
        }
    }
    for i in 0..samples {
        let angle = TAU * i as f64 / samples as f64;
        if let Some(v) = sample(luma, cx + radius * angle.cos(), cy + radius * angle.sin()) {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_dark_core_bright_ring() {
        let image = GrayImage::from_fn(64, 64, |x, y| {
            let d = (f64::from(x) + 0.5 - 32.0).hypot(f64::from(y) + 0.5 - 30.0);
            Luma([if d <= 6.0 { 20 } else { 235 }])
        });
        let found = scan(&image, PixelRect::new(0, 0, 64, 64), &PupilConfig::default()).unwrap();
        assert!((found.x - 32.0).abs() < 1.0);
        assert!((found.y - 30.0).abs() < 1.0);
        assert!(found.confidence > 0.8);
    }

    #[test]
    fn test_bright_core_is_ignored() {
        // Bright disk on a mid-grey background must not register
        let image = GrayImage::from_fn(64, 64, |x, y| {
            let d = (f64::from(x) - 32.0).hypot(f64::from(y) - 32.0);
            Luma([if d <= 6.0 { 240 } else { 150 }])
        });
        assert!(scan(&image, PixelRect::new(0, 0, 64, 64), &PupilConfig::default()).is_none());
    }
}
