//! Fixation stability gate
//!
//! Single-frame proximity does not separate a genuine fixation from gaze
//! passing through. Every check below must hold at once.

use crate::config::GateConfig;
use crate::FilterError;
use gaze_stats::{distance, WindowStats};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Capacity of the sample window (about four seconds at 60 fps)
const WINDOW_CAPACITY: usize = 256;

/// Individual gate checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateCheck {
    /// Current distance below threshold
    Distance,
    /// Enough samples inside the time window
    SampleCount,
    /// Window mean below `mean_ratio` of the threshold
    WindowMean,
    /// Standard deviation of window distances bounded
    Dispersion,
    /// Few large position steps
    JumpRatio,
    /// Distance not growing between window halves
    Trend,
    /// Each of the most recent samples within threshold
    RecentSamples,
}

/// Gate verdict with the measurements behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub stable: bool,
    pub failed: Vec<GateCheck>,
    pub distance: f64,
    pub window_mean: f64,
    pub window_std_dev: f64,
    pub jump_ratio: f64,
    pub sample_count: usize,
}

impl StabilityReport {
    pub fn failed_check(&self, check: GateCheck) -> bool {
        self.failed.contains(&check)
    }
}

#[derive(Debug, Clone, Copy)]
struct GateSample {
    timestamp_ms: u64,
    point: (f64, f64),
    distance: f64,
}

/// Time-windowed multi-criterion stability gate
#[derive(Debug, Clone)]
pub struct StabilityGate {
    config: GateConfig,
    samples: RingBuffer<GateSample>,
}

impl StabilityGate {
    pub fn new(config: GateConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let samples = RingBuffer::new(WINDOW_CAPACITY).map_err(|e| FilterError::Config(e.to_string()))?;
        Ok(Self { config, samples })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Record a sample and evaluate every check.
    ///
    /// `reference` is the point the gaze should hold (calibration target or
    /// previous fixation); `threshold` is the accuracy radius in pixels.
    pub fn observe(&mut self, timestamp_ms: u64, point: (f64, f64), reference: (f64, f64), threshold: f64) -> StabilityReport {
        let current = distance(point, reference);
        self.samples.push(GateSample {
            timestamp_ms,
            point,
            distance: current,
        });
        let cutoff = timestamp_ms.saturating_sub(self.config.window_ms);
        self.samples.retain(|s| s.timestamp_ms >= cutoff);

        let distances: Vec<f64> = self.samples.iter().map(|s| s.distance).collect();
        let stats = WindowStats::compute(&distances);
        let steps: Vec<f64> = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| distance(a.point, b.point))
            .collect();
        let jump_ratio = WindowStats::fraction_above(&steps, self.config.jump_step_px);

        let mut failed = Vec::new();
        if current >= threshold {
            failed.push(GateCheck::Distance);
        }
        if stats.count < self.config.min_samples {
            failed.push(GateCheck::SampleCount);
        }
        if stats.mean >= threshold * self.config.mean_ratio {
            failed.push(GateCheck::WindowMean);
        }
        if stats.std_dev >= self.config.max_std_dev {
            failed.push(GateCheck::Dispersion);
        }
        if jump_ratio >= self.config.max_jump_ratio && !steps.is_empty() {
            failed.push(GateCheck::JumpRatio);
        }
        if let Some((first, second)) = WindowStats::half_means(&distances) {
            if second - first > self.config.trend_tolerance_px {
                failed.push(GateCheck::Trend);
            }
        }
        let recent_ok = self.samples.len() >= self.config.recent_count
            && self
                .samples
                .read_last(self.config.recent_count)
                .iter()
                .all(|s| s.distance < threshold);
        if !recent_ok {
            failed.push(GateCheck::RecentSamples);
        }

        let report = StabilityReport {
            stable: failed.is_empty(),
            failed,
            distance: current,
            window_mean: stats.mean,
            window_std_dev: stats.std_dev,
            jump_ratio,
            sample_count: stats.count,
        };
        trace!("Stability gate: {:?}", report);
        report
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u64 = 33;

    fn feed(gate: &mut StabilityGate, points: &[(f64, f64)], reference: (f64, f64), threshold: f64) -> StabilityReport {
        let mut report = None;
        for (i, p) in points.iter().enumerate() {
            report = Some(gate.observe(i as u64 * FRAME_MS, *p, reference, threshold));
        }
        report.unwrap()
    }

    #[test]
    fn test_steady_fixation_is_stable() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        let points: Vec<_> = (0..20).map(|i| (500.0 + (i % 3) as f64, 300.0 - (i % 2) as f64)).collect();
        let report = feed(&mut gate, &points, (505.0, 300.0), 100.0);
        assert!(report.stable, "failed: {:?}", report.failed);
        assert_eq!(report.jump_ratio, 0.0);
    }

    #[test]
    fn test_high_dispersion_fails_even_with_good_mean() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        // Distances alternate 10 and 70 px: mean 40 < 80, std dev 30 > 25
        let points: Vec<_> = (0..20)
            .map(|i| if i % 2 == 0 { (510.0, 300.0) } else { (570.0, 300.0) })
            .collect();
        let report = feed(&mut gate, &points, (500.0, 300.0), 100.0);
        assert!(report.window_mean < 80.0);
        assert!(report.window_std_dev > 25.0);
        assert!(!report.stable);
        assert!(report.failed_check(GateCheck::Dispersion));
    }

    #[test]
    fn test_too_few_samples() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        let report = feed(&mut gate, &[(500.0, 300.0); 3], (500.0, 300.0), 100.0);
        assert!(!report.stable);
        assert!(report.failed_check(GateCheck::SampleCount));
        assert!(report.failed_check(GateCheck::RecentSamples));
    }

    #[test]
    fn test_drifting_away_fails_trend() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        let points: Vec<_> = (0..20).map(|i| (500.0 + 2.0 * i as f64, 300.0)).collect();
        let report = feed(&mut gate, &points, (500.0, 300.0), 100.0);
        assert!(report.failed_check(GateCheck::Trend));
        assert!(!report.stable);
    }

    #[test]
    fn test_passing_transit_fails() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        // Sweeps across the target in 40px steps
        let points: Vec<_> = (0..10).map(|i| (300.0 + 40.0 * i as f64, 300.0)).collect();
        let report = gate.observe(0, (0.0, 0.0), (0.0, 0.0), 1.0);
        assert!(!report.stable);
        gate.clear();
        let report = feed(&mut gate, &points[..6], (500.0, 300.0), 100.0);
        // Last point sits exactly on target but the history is a sweep
        assert_eq!(report.distance, 0.0);
        assert!(!report.stable);
        assert!(report.failed_check(GateCheck::JumpRatio));
    }

    #[test]
    fn test_window_expires_old_samples() {
        let mut gate = StabilityGate::new(GateConfig::default()).unwrap();
        for i in 0..10u64 {
            gate.observe(i * FRAME_MS, (0.0, 0.0), (0.0, 0.0), 100.0);
        }
        gate.observe(10_000, (0.0, 0.0), (0.0, 0.0), 100.0);
        assert_eq!(gate.sample_count(), 1);
    }
}
