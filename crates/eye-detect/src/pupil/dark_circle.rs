//! Dark-circle scan
//!
//! Slides candidate circles over the eye region and scores how dark their
//! circumference is. The pupil is the largest circle whose rim stays dark.

use super::{dark_threshold, refine_center, region_mean, sample, EyeCandidate};
use crate::config::PupilConfig;
use crate::pupil::DetectionMethod;
use frame_input::PixelRect;
use image::GrayImage;
use std::f64::consts::TAU;

/// Weight of the dark-sample ratio in the circle score
const DARK_RATIO_WEIGHT: f64 = 0.6;
/// Weight of the mean darkness in the circle score
const DARKNESS_WEIGHT: f64 = 0.4;

pub(crate) fn scan(luma: &GrayImage, rect: PixelRect, config: &PupilConfig) -> Option<EyeCandidate> {
    let mean = region_mean(luma, rect)?;
    let threshold = dark_threshold(config, mean);
    let step = config.center_step.max(1) as usize;

    let mut best: Option<(f64, f64, u32, f64)> = None;
    for radius in (config.min_radius..=config.max_radius).step_by(config.radius_step.max(1) as usize) {
        if rect.width < 2 * radius + 1 || rect.height < 2 * radius + 1 {
            break;
        }
        for py in (rect.y + radius..rect.bottom() - radius).step_by(step) {
            for px in (rect.x + radius..rect.right() - radius).step_by(step) {
                let cx = f64::from(px) + 0.5;
                let cy = f64::from(py) + 0.5;
                let Some(score) = circle_score(luma, cx, cy, f64::from(radius), threshold, config.circle_samples) else {
                    continue;
                };
                // Ascending radius: ties go to the larger circle
                if best.map_or(true, |(_, _, _, s)| score >= s) {
                    best = Some((cx, cy, radius, score));
                }
            }
        }
    }

    let (cx, cy, radius, score) = best?;
    let (x, y) = refine_center(luma, rect, cx, cy, f64::from(radius), threshold);
    Some(EyeCandidate {
        x,
        y,
        radius: f64::from(radius),
        confidence: score.clamp(0.0, 1.0),
        method: DetectionMethod::DarkCircle,
    })
}

/// Score a circle: `0.6 * dark_ratio + 0.4 * average_darkness`
fn circle_score(luma: &GrayImage, cx: f64, cy: f64, radius: f64, threshold: f64, samples: usize) -> Option<f64> {
    let mut dark = 0usize;
    let mut darkness = 0.0;
    let mut taken = 0usize;
    for i in 0..samples {
        let angle = TAU * i as f64 / samples as f64;
        let Some(value) = sample(luma, cx + radius * angle.cos(), cy + radius * angle.sin()) else {
            continue;
        };
        taken += 1;
        if value < threshold {
            dark += 1;
        }
        darkness += 1.0 - value / 255.0;
    }
    if taken == 0 {
        return None;
    }
    let n = taken as f64;
    Some(DARK_RATIO_WEIGHT * dark as f64 / n + DARKNESS_WEIGHT * darkness / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disk(size: u32, cx: f64, cy: f64, r: f64) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                Luma([15])
            } else {
                Luma([230])
            }
        })
    }

    #[test]
    fn test_finds_dark_disk() {
        let image = disk(60, 27.3, 31.8, 6.0);
        let rect = PixelRect::new(0, 0, 60, 60);
        let found = scan(&image, rect, &PupilConfig::default()).unwrap();
        assert!((found.x - 27.3).abs() < 0.6, "x={}", found.x);
        assert!((found.y - 31.8).abs() < 0.6, "y={}", found.y);
        assert!(found.confidence > 0.9);
        assert!(found.radius >= 3.0 && found.radius <= 7.0);
    }

    #[test]
    fn test_uniform_region_scores_low() {
        let image = GrayImage::from_pixel(40, 40, Luma([200]));
        let found = scan(&image, PixelRect::new(0, 0, 40, 40), &PupilConfig::default()).unwrap();
        assert!(found.confidence < 0.3);
    }

    #[test]
    fn test_region_too_small() {
        let image = disk(60, 30.0, 30.0, 6.0);
        let config = PupilConfig::default();
        assert!(scan(&image, PixelRect::new(25, 25, 6, 6), &config).is_none());
    }
}
