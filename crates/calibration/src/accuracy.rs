//! Accuracy scoring

use crate::config::ValidationConfig;
use gaze_stats::WindowStats;
use serde::{Deserialize, Serialize};

/// Weights of the per-point score components
const DISTANCE_WEIGHT: f64 = 0.6;
const DISPERSION_WEIGHT: f64 = 0.25;
const VALID_WEIGHT: f64 = 0.15;

/// Calibration quality, each component in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationAccuracy {
    pub overall: f64,
    pub horizontal: f64,
    pub vertical: f64,
    pub stability: f64,
}

/// Measured accuracy at one test point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAccuracy {
    /// Target in normalized screen coordinates
    pub target: (f64, f64),
    /// Mapped gaze points in normalized screen coordinates
    pub mapped: Vec<(f64, f64)>,
    /// Frames during the measurement that produced no usable sample
    pub invalid: usize,
}

impl PointAccuracy {
    pub fn new(target: (f64, f64)) -> Self {
        Self {
            target,
            mapped: Vec::new(),
            invalid: 0,
        }
    }

    pub fn valid_ratio(&self) -> f64 {
        let total = self.mapped.len() + self.invalid;
        if total == 0 {
            0.0
        } else {
            self.mapped.len() as f64 / total as f64
        }
    }
}

/// Score a set of measured points.
///
/// Per point: `0.6·distance + 0.25·dispersion + 0.15·valid_ratio`, where the
/// distance and dispersion scores fall linearly to zero at the configured
/// pixel limits. A point with no valid samples scores zero.
pub fn score_points(points: &[PointAccuracy], viewport: (f64, f64), config: &ValidationConfig) -> CalibrationAccuracy {
    if points.is_empty() {
        return CalibrationAccuracy::default();
    }

    let falloff = |value: f64, limit: f64| (1.0 - value / limit).clamp(0.0, 1.0);
    let (mut overall, mut horizontal, mut vertical, mut stability) = (0.0, 0.0, 0.0, 0.0);

    for point in points {
        if point.mapped.is_empty() {
            continue;
        }
        let errors_px: Vec<(f64, f64)> = point
            .mapped
            .iter()
            .map(|(x, y)| ((x - point.target.0) * viewport.0, (y - point.target.1) * viewport.1))
            .collect();
        let distances: Vec<f64> = errors_px.iter().map(|(dx, dy)| dx.hypot(*dy)).collect();
        let stats = WindowStats::compute(&distances);
        let n = errors_px.len() as f64;
        let mean_dx = errors_px.iter().map(|(dx, _)| dx.abs()).sum::<f64>() / n;
        let mean_dy = errors_px.iter().map(|(_, dy)| dy.abs()).sum::<f64>() / n;

        let distance_score = falloff(stats.mean, config.max_error_px);
        let dispersion_score = falloff(stats.std_dev, config.max_dispersion_px);

        overall += DISTANCE_WEIGHT * distance_score + DISPERSION_WEIGHT * dispersion_score + VALID_WEIGHT * point.valid_ratio();
        horizontal += falloff(mean_dx, config.max_error_px);
        vertical += falloff(mean_dy, config.max_error_px);
        stability += dispersion_score;
    }

    let n = points.len() as f64;
    CalibrationAccuracy {
        overall: overall / n,
        horizontal: horizontal / n,
        vertical: vertical / n,
        stability: stability / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: (f64, f64) = (1920.0, 1080.0);

    fn point(target: (f64, f64), mapped: Vec<(f64, f64)>, invalid: usize) -> PointAccuracy {
        PointAccuracy { target, mapped, invalid }
    }

    #[test]
    fn test_perfect_samples_score_one() {
        let points: Vec<_> = [(0.15, 0.15), (0.5, 0.5), (0.85, 0.85)]
            .iter()
            .map(|&t| point(t, vec![t; 20], 0))
            .collect();
        let accuracy = score_points(&points, VIEWPORT, &ValidationConfig::default());
        assert!((accuracy.overall - 1.0).abs() < 1e-12);
        assert_eq!(accuracy.horizontal, 1.0);
        assert_eq!(accuracy.stability, 1.0);
    }

    #[test]
    fn test_offset_lowers_horizontal_only() {
        // 96px to the right of every target
        let points: Vec<_> = [(0.15, 0.5), (0.85, 0.5)]
            .iter()
            .map(|&t| point(t, vec![(t.0 + 0.05, t.1); 10], 0))
            .collect();
        let accuracy = score_points(&points, VIEWPORT, &ValidationConfig::default());
        assert!(accuracy.horizontal < 0.6);
        assert_eq!(accuracy.vertical, 1.0);
        assert!(accuracy.overall < 0.8);
    }

    #[test]
    fn test_invalid_frames_reduce_score() {
        let clean = [point((0.5, 0.5), vec![(0.5, 0.5); 10], 0)];
        let lossy = [point((0.5, 0.5), vec![(0.5, 0.5); 10], 10)];
        let config = ValidationConfig::default();
        let a = score_points(&clean, VIEWPORT, &config);
        let b = score_points(&lossy, VIEWPORT, &config);
        assert!((a.overall - b.overall - 0.075).abs() < 1e-9);
    }

    #[test]
    fn test_empty_point_scores_zero() {
        let points = [point((0.5, 0.5), vec![(0.5, 0.5); 10], 0), point((0.15, 0.15), Vec::new(), 60)];
        let accuracy = score_points(&points, VIEWPORT, &ValidationConfig::default());
        assert!((accuracy.overall - 0.5).abs() < 1e-12);
    }
}
