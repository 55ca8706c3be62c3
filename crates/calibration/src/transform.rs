//! Raw-to-screen calibration transform

use crate::config::FitModel;
use crate::error::CalibrationError;
use gaze_stats::{AffineFit, LinearFit};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest accepted fitted scale
const MIN_SCALE: f64 = 1e-9;

/// One recorded observation for a calibration target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub point_id: usize,
    /// Target in normalized screen coordinates
    pub target: (f64, f64),
    /// Face-relative raw eye point
    pub raw: (f64, f64),
    pub confidence: f64,
    pub timestamp_ms: u64,
    /// Recorded on timeout rather than after a stable fixation
    pub low_confidence: bool,
}

/// Screen quadrant of a normalized coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    pub fn of(point: (f64, f64)) -> Self {
        match (point.0 < 0.5, point.1 < 0.5) {
            (true, true) => Quadrant::TopLeft,
            (false, true) => Quadrant::TopRight,
            (true, false) => Quadrant::BottomLeft,
            (false, false) => Quadrant::BottomRight,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Fitted mapping from raw eye points to normalized screen coordinates.
///
/// `x' = scale_x·x + skew_x·y + offset_x`, `y' = skew_y·x + scale_y·y + offset_y`,
/// then the residual correction of the quadrant `(x', y')` falls in is added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    /// Additive (x, y) correction per quadrant, indexed by `Quadrant::index`
    pub quadrant_correction: [(f64, f64); 4],
}

impl CalibrationTransform {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            quadrant_correction: [(0.0, 0.0); 4],
        }
    }

    /// Linear part only
    pub fn apply_linear(&self, raw: (f64, f64)) -> (f64, f64) {
        (
            self.scale_x * raw.0 + self.skew_x * raw.1 + self.offset_x,
            self.skew_y * raw.0 + self.scale_y * raw.1 + self.offset_y,
        )
    }

    /// Full mapping, clamped to `[0, 1]`
    pub fn apply(&self, raw: (f64, f64)) -> (f64, f64) {
        let linear = self.apply_linear(raw);
        let (cx, cy) = self.quadrant_correction[Quadrant::of(linear).index()];
        ((linear.0 + cx).clamp(0.0, 1.0), (linear.1 + cy).clamp(0.0, 1.0))
    }

    /// Fit from calibration samples.
    ///
    /// The linear part uses the most confident sample of each point; the
    /// quadrant correction averages residuals over every sample.
    pub fn fit(samples: &[CalibrationSample], model: FitModel) -> Result<Self, CalibrationError> {
        let best = best_per_point(samples);
        if best.len() < 3 {
            return Err(CalibrationError::InsufficientPoints {
                required: 3,
                actual: best.len(),
            });
        }

        let mut transform = match model {
            FitModel::PerAxis => {
                let raw_x: Vec<f64> = best.iter().map(|s| s.raw.0).collect();
                let raw_y: Vec<f64> = best.iter().map(|s| s.raw.1).collect();
                let target_x: Vec<f64> = best.iter().map(|s| s.target.0).collect();
                let target_y: Vec<f64> = best.iter().map(|s| s.target.1).collect();
                let fx = LinearFit::fit(&raw_x, &target_x)?;
                let fy = LinearFit::fit(&raw_y, &target_y)?;
                debug!("Per-axis fit: r2_x={:.4} r2_y={:.4}", fx.r_squared, fy.r_squared);
                Self {
                    scale_x: fx.slope,
                    scale_y: fy.slope,
                    offset_x: fx.offset,
                    offset_y: fy.offset,
                    ..Self::identity()
                }
            }
            FitModel::Affine => {
                let pairs: Vec<_> = best.iter().map(|s| (s.raw, s.target)).collect();
                let fit = AffineFit::fit(&pairs)?;
                Self {
                    scale_x: fit.x_coef[0],
                    skew_x: fit.x_coef[1],
                    offset_x: fit.x_coef[2],
                    skew_y: fit.y_coef[0],
                    scale_y: fit.y_coef[1],
                    offset_y: fit.y_coef[2],
                    ..Self::identity()
                }
            }
        };

        if transform.scale_x.abs() < MIN_SCALE {
            return Err(CalibrationError::ZeroScale("x"));
        }
        if transform.scale_y.abs() < MIN_SCALE {
            return Err(CalibrationError::ZeroScale("y"));
        }

        transform.quadrant_correction = transform.quadrant_residuals(samples);
        Ok(transform)
    }

    /// Mean residual `target - linear(raw)` per quadrant; empty quadrants get zero
    fn quadrant_residuals(&self, samples: &[CalibrationSample]) -> [(f64, f64); 4] {
        let mut sums = [(0.0f64, 0.0f64, 0usize); 4];
        for s in samples {
            let linear = self.apply_linear(s.raw);
            let q = Quadrant::of(linear).index();
            sums[q].0 += s.target.0 - linear.0;
            sums[q].1 += s.target.1 - linear.1;
            sums[q].2 += 1;
        }
        sums.map(|(dx, dy, n)| if n == 0 { (0.0, 0.0) } else { (dx / n as f64, dy / n as f64) })
    }
}

impl Default for CalibrationTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Most confident sample per point id, in point order
fn best_per_point(samples: &[CalibrationSample]) -> Vec<CalibrationSample> {
    let mut best: Vec<CalibrationSample> = Vec::new();
    for s in samples {
        match best.iter_mut().find(|b| b.point_id == s.point_id) {
            Some(b) if s.confidence > b.confidence => *b = *s,
            Some(_) => {}
            None => best.push(*s),
        }
    }
    best.sort_by_key(|s| s.point_id);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{calibration_points, CalibrationMode};
    use proptest::prelude::*;

    fn samples_from(map: impl Fn((f64, f64)) -> (f64, f64)) -> Vec<CalibrationSample> {
        calibration_points(CalibrationMode::Standard9)
            .into_iter()
            .map(|p| CalibrationSample {
                point_id: p.id,
                target: (p.x, p.y),
                raw: map((p.x, p.y)),
                confidence: 0.9,
                timestamp_ms: 0,
                low_confidence: false,
            })
            .collect()
    }

    #[test]
    fn test_identity_fit() {
        let transform = CalibrationTransform::fit(&samples_from(|t| t), FitModel::PerAxis).unwrap();
        assert!((transform.scale_x - 1.0).abs() < 1e-6);
        assert!((transform.scale_y - 1.0).abs() < 1e-6);
        assert!(transform.offset_x.abs() < 1e-6);
        assert!(transform.offset_y.abs() < 1e-6);
        for (cx, cy) in transform.quadrant_correction {
            assert!(cx.abs() < 1e-9 && cy.abs() < 1e-9);
        }
    }

    #[test]
    fn test_recovers_face_relative_mapping() {
        // Raw eye points move over a small range around the eye line
        let samples = samples_from(|(x, y)| (0.5 + (x - 0.5) / 7.5, 0.35 + (y - 0.5) / 12.0));
        let transform = CalibrationTransform::fit(&samples, FitModel::PerAxis).unwrap();
        for s in &samples {
            let (x, y) = transform.apply(s.raw);
            assert!((x - s.target.0).abs() < 1e-6 && (y - s.target.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_affine_captures_skew() {
        let samples = samples_from(|(x, y)| (0.4 + 0.1 * x + 0.03 * y, 0.3 + 0.08 * y - 0.02 * x));
        let per_axis = CalibrationTransform::fit(&samples, FitModel::PerAxis).unwrap();
        let affine = CalibrationTransform::fit(&samples, FitModel::Affine).unwrap();
        assert!(affine.skew_x.abs() > 1e-3);

        let error = |t: &CalibrationTransform| {
            samples
                .iter()
                .map(|s| {
                    let (x, y) = t.apply_linear(s.raw);
                    (x - s.target.0).hypot(y - s.target.1)
                })
                .sum::<f64>()
        };
        assert!(error(&affine) < 1e-6);
        assert!(error(&per_axis) > error(&affine));
    }

    #[test]
    fn test_quadrant_correction_reduces_residual() {
        // Top-left of the field reads 0.05 too far left
        let samples = samples_from(|(x, y)| if x < 0.5 && y < 0.5 { (x - 0.05, y) } else { (x, y) });
        let transform = CalibrationTransform::fit(&samples, FitModel::PerAxis).unwrap();
        let corner = samples.iter().find(|s| s.target == (0.1, 0.1)).unwrap();
        let linear = transform.apply_linear(corner.raw);
        let corrected = transform.apply(corner.raw);
        let before = (linear.0 - 0.1).hypot(linear.1 - 0.1);
        let after = (corrected.0 - 0.1).hypot(corrected.1 - 0.1);
        assert!(after < before);
    }

    #[test]
    fn test_insufficient_points() {
        let samples: Vec<_> = samples_from(|t| t).into_iter().take(2).collect();
        assert_eq!(
            CalibrationTransform::fit(&samples, FitModel::PerAxis),
            Err(CalibrationError::InsufficientPoints { required: 3, actual: 2 })
        );
    }

    #[test]
    fn test_degenerate_raw_spread() {
        let samples = samples_from(|_| (0.5, 0.35));
        assert!(matches!(
            CalibrationTransform::fit(&samples, FitModel::PerAxis),
            Err(CalibrationError::DegenerateFit(_))
        ));
    }

    #[test]
    fn test_most_confident_sample_used() {
        let mut samples = samples_from(|t| t);
        // A low-confidence outlier for the center point is ignored by the linear fit
        samples.push(CalibrationSample {
            raw: (0.9, 0.9),
            confidence: 0.1,
            ..samples[0]
        });
        let best = best_per_point(&samples);
        assert_eq!(best.len(), 9);
        assert_eq!(best[0].raw, (0.5, 0.5));
    }

    #[test]
    fn test_apply_clamps() {
        let transform = CalibrationTransform {
            offset_x: 2.0,
            offset_y: -3.0,
            ..CalibrationTransform::identity()
        };
        assert_eq!(transform.apply((0.5, 0.5)), (1.0, 0.0));
    }

    proptest! {
        #[test]
        fn test_apply_is_idempotent(rx in -1.0f64..2.0, ry in -1.0f64..2.0, sx in 0.1f64..10.0, ox in -1.0f64..1.0) {
            let transform = CalibrationTransform {
                scale_x: sx,
                offset_x: ox,
                quadrant_correction: [(0.01, -0.02), (0.0, 0.03), (-0.01, 0.0), (0.02, 0.02)],
                ..CalibrationTransform::identity()
            };
            let first = transform.apply((rx, ry));
            let second = transform.apply((rx, ry));
            prop_assert_eq!(first, second);
            prop_assert!((0.0..=1.0).contains(&first.0) && (0.0..=1.0).contains(&first.1));
        }
    }
}
