//! Windowed Statistics Computation

use serde::{Deserialize, Serialize};

/// Statistical summary of a window of samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Number of samples
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Standard deviation (population)
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean absolute change between consecutive samples
    pub rate_of_change: f64,
}

impl WindowStats {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let rate_of_change = if values.len() >= 2 {
            values.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        Self {
            count: values.len(),
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            rate_of_change,
        }
    }

    /// Variance (population)
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Fraction of values strictly above `threshold` (0 when empty)
    pub fn fraction_above(values: &[f64], threshold: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().filter(|&&v| v > threshold).count() as f64 / values.len() as f64
    }

    /// Means of the first and second half of the window.
    ///
    /// With an odd count the middle sample belongs to the second half.
    pub fn half_means(values: &[f64]) -> Option<(f64, f64)> {
        if values.len() < 2 {
            return None;
        }
        let mid = values.len() / 2;
        let (first, second) = values.split_at(mid);
        let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
        Some((mean(first), mean(second)))
    }
}

/// Euclidean distance between two points
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let stats = WindowStats::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.rate_of_change - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_computation() {
        let stats = WindowStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert!((stats.variance() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_values() {
        let stats = WindowStats::compute(&[]);
        assert_eq!(stats, WindowStats::default());
    }

    #[test]
    fn test_fraction_above() {
        assert_eq!(WindowStats::fraction_above(&[10.0, 40.0, 35.0, 5.0], 30.0), 0.5);
        assert_eq!(WindowStats::fraction_above(&[], 30.0), 0.0);
    }

    #[test]
    fn test_half_means() {
        let (first, second) = WindowStats::half_means(&[1.0, 3.0, 10.0, 20.0, 30.0]).unwrap();
        assert_eq!(first, 2.0);
        assert_eq!(second, 20.0);
        assert!(WindowStats::half_means(&[1.0]).is_none());
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance((0.0, 0.0), (3.0, 4.0)), 5.0);
    }
}
