//! Point smoothing using EWMA

/// Exponentially weighted moving average over 2D points
#[derive(Debug, Clone)]
pub struct PointSmoother {
    /// EWMA smoothing factor (0-1, higher = more weight on recent)
    alpha: f64,
    /// Current smoothed point, `None` until the first sample
    value: Option<(f64, f64)>,
}

impl PointSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    /// Blend a new point into the average and return the smoothed point
    pub fn smooth(&mut self, point: (f64, f64)) -> (f64, f64) {
        let next = match self.value {
            None => point,
            Some((x, y)) => (
                x + self.alpha * (point.0 - x),
                y + self.alpha * (point.1 - y),
            ),
        };
        self.value = Some(next);
        next
    }

    /// Restart the average at `point`
    pub fn reset_to(&mut self, point: (f64, f64)) {
        self.value = Some(point);
    }

    pub fn value(&self) -> Option<(f64, f64)> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = PointSmoother::new(0.3);
        assert_eq!(smoother.smooth((10.0, 20.0)), (10.0, 20.0));
    }

    #[test]
    fn test_blend() {
        let mut smoother = PointSmoother::new(0.3);
        smoother.smooth((0.0, 0.0));
        let (x, y) = smoother.smooth((100.0, -50.0));
        assert!((x - 30.0).abs() < 1e-12);
        assert!((y + 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_converges_on_constant_input() {
        let mut smoother = PointSmoother::new(0.3);
        smoother.smooth((0.0, 0.0));
        for _ in 0..60 {
            smoother.smooth((200.0, 100.0));
        }
        let (x, y) = smoother.value().unwrap();
        assert!((x - 200.0).abs() < 1e-6);
        assert!((y - 100.0).abs() < 1e-6);
        smoother.reset();
        assert!(smoother.value().is_none());
    }
}
