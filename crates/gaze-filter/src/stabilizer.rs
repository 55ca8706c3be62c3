//! Gaze stabilizer
//!
//! Keeps a short history of accepted observations, rejects samples that
//! jump too far from the rolling average, smooths the position and scores
//! how stable recent motion has been.
//!
//! Each eye also gets its own ring of face-relative positions. When only
//! one eye is found, the combined point is rebuilt from that eye and the
//! mean inter-eye offset instead of collapsing onto the visible eye.

use crate::config::{SmoothingMode, StabilizerConfig};
use crate::smoother::PointSmoother;
use crate::validator::ObservationValidator;
use crate::FilterError;
use gaze_stats::{distance, WindowStats};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// One frame's gaze measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeObservation {
    /// Face-relative raw eye point (fractions of the face box)
    pub raw: (f64, f64),
    /// Projection of `raw` into screen pixels
    pub screen: (f64, f64),
    /// Detection confidence (0-1)
    pub confidence: f64,
    pub timestamp_ms: u64,
}

/// Stabilized gaze estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeEstimate {
    /// Screen position (smoothed unless the stabilizer runs in raw mode)
    pub x: f64,
    pub y: f64,
    /// Latest accepted screen position, unsmoothed
    pub screen_raw: (f64, f64),
    /// Latest accepted face-relative raw point
    pub raw: (f64, f64),
    pub confidence: f64,
    pub stability: f64,
    pub timestamp_ms: u64,
}

impl GazeEstimate {
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// What happened to a pushed observation
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Accepted,
    /// Too far from the rolling average; history untouched
    Rejected { displacement: f64, threshold: f64 },
    /// Accepted after repeated rejections; history restarted at this sample
    Reanchored,
    Invalid(FilterError),
    /// No detection this frame
    Missing,
}

/// Outcome counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizerStats {
    pub accepted: u64,
    pub rejected: u64,
    pub reanchored: u64,
    pub invalid: u64,
    pub missing: u64,
}

/// Temporal gaze filter
#[derive(Debug, Clone)]
pub struct GazeStabilizer {
    config: StabilizerConfig,
    history: RingBuffer<GazeObservation>,
    /// Face-relative eye positions from frames where both eyes were found
    left_eyes: RingBuffer<(f64, f64)>,
    right_eyes: RingBuffer<(f64, f64)>,
    /// Per-frame detection confidence, zero for missed or invalid frames
    confidences: RingBuffer<f64>,
    smoother: PointSmoother,
    validator: ObservationValidator,
    consecutive_rejections: u32,
    estimate: Option<GazeEstimate>,
    stats: StabilizerStats,
}

impl GazeStabilizer {
    pub fn new(config: StabilizerConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let history = RingBuffer::new(config.history_size).map_err(|e| FilterError::Config(e.to_string()))?;
        let confidences = RingBuffer::new(config.history_size).map_err(|e| FilterError::Config(e.to_string()))?;
        let left_eyes = RingBuffer::new(config.history_size).map_err(|e| FilterError::Config(e.to_string()))?;
        let right_eyes = RingBuffer::new(config.history_size).map_err(|e| FilterError::Config(e.to_string()))?;
        Ok(Self {
            smoother: PointSmoother::new(config.smoothing_alpha),
            history,
            left_eyes,
            right_eyes,
            confidences,
            validator: ObservationValidator::default(),
            consecutive_rejections: 0,
            estimate: None,
            stats: StabilizerStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn set_mode(&mut self, mode: SmoothingMode) {
        self.config.mode = mode;
    }

    /// Feed one observation
    pub fn push(&mut self, obs: GazeObservation) -> SampleOutcome {
        if let Err(e) = self.validator.validate(obs.raw, obs.screen) {
            debug!("Discarding invalid gaze observation: {}", e);
            self.stats.invalid += 1;
            self.confidences.push(0.0);
            self.refresh(obs.timestamp_ms);
            return SampleOutcome::Invalid(e);
        }

        let outcome = match self.rolling_average() {
            Some(average) => {
                let displacement = distance(obs.screen, average);
                let threshold = self.jump_threshold();
                if displacement <= threshold {
                    SampleOutcome::Accepted
                } else if self.consecutive_rejections >= self.config.max_consecutive_rejections {
                    SampleOutcome::Reanchored
                } else {
                    SampleOutcome::Rejected { displacement, threshold }
                }
            }
            None => SampleOutcome::Accepted,
        };

        match outcome {
            SampleOutcome::Accepted => {
                self.consecutive_rejections = 0;
                self.history.push(obs);
                self.smoother.smooth(obs.screen);
                self.confidences.push(obs.confidence.clamp(0.0, 1.0));
                self.stats.accepted += 1;
            }
            SampleOutcome::Reanchored => {
                info!(
                    "Gaze re-anchored at ({:.0}, {:.0}) after {} rejected samples",
                    obs.screen.0, obs.screen.1, self.consecutive_rejections
                );
                self.consecutive_rejections = 0;
                self.history.clear();
                self.history.push(obs);
                self.smoother.reset_to(obs.screen);
                self.confidences.push(obs.confidence.clamp(0.0, 1.0));
                self.stats.reanchored += 1;
            }
            SampleOutcome::Rejected { displacement, threshold } => {
                trace!("Rejected gaze jump {:.0}px (threshold {:.0}px)", displacement, threshold);
                self.consecutive_rejections += 1;
                self.stats.rejected += 1;
                return outcome;
            }
            SampleOutcome::Invalid(_) | SampleOutcome::Missing => {}
        }

        self.refresh(obs.timestamp_ms);
        outcome
    }

    /// Combine per-eye face-relative points into one observation point.
    ///
    /// With both eyes the midpoint is returned and the pair is remembered.
    /// With one eye the midpoint is rebuilt from the mean inter-eye offset;
    /// `None` when no pair has been seen yet or neither eye is usable.
    pub fn combine_eyes(&mut self, left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> Option<(f64, f64)> {
        let finite = |p: &(f64, f64)| p.0.is_finite() && p.1.is_finite();
        match (left.filter(finite), right.filter(finite)) {
            (Some(l), Some(r)) => {
                self.left_eyes.push(l);
                self.right_eyes.push(r);
                Some(((l.0 + r.0) / 2.0, (l.1 + r.1) / 2.0))
            }
            (Some(l), None) => {
                let (dx, dy) = self.eye_offset()?;
                trace!("Right eye missing, rebuilding from left eye");
                Some((l.0 + dx / 2.0, l.1 + dy / 2.0))
            }
            (None, Some(r)) => {
                let (dx, dy) = self.eye_offset()?;
                trace!("Left eye missing, rebuilding from right eye");
                Some((r.0 - dx / 2.0, r.1 - dy / 2.0))
            }
            (None, None) => None,
        }
    }

    /// Mean right-minus-left eye offset over remembered pairs
    pub fn eye_offset(&self) -> Option<(f64, f64)> {
        let n = self.left_eyes.len();
        if n == 0 || n != self.right_eyes.len() {
            return None;
        }
        let (sx, sy) = self
            .left_eyes
            .iter()
            .zip(self.right_eyes.iter())
            .fold((0.0, 0.0), |(sx, sy), (l, r)| (sx + r.0 - l.0, sy + r.1 - l.1));
        Some((sx / n as f64, sy / n as f64))
    }

    /// Record a frame without a usable detection
    pub fn record_miss(&mut self, timestamp_ms: u64) -> SampleOutcome {
        self.stats.missing += 1;
        self.confidences.push(0.0);
        self.refresh(timestamp_ms);
        SampleOutcome::Missing
    }

    /// Current estimate, `None` until a sample has been accepted
    pub fn estimate(&self) -> Option<GazeEstimate> {
        self.estimate
    }

    /// Mean of accepted screen positions
    pub fn rolling_average(&self) -> Option<(f64, f64)> {
        if self.history.is_empty() {
            return None;
        }
        let n = self.history.len() as f64;
        let (sx, sy) = self
            .history
            .iter()
            .fold((0.0, 0.0), |(sx, sy), o| (sx + o.screen.0, sy + o.screen.1));
        Some((sx / n, sy / n))
    }

    /// Adaptive jump threshold from the mean step size of the history
    pub fn jump_threshold(&self) -> f64 {
        let steps = self.steps(self.history.len());
        let mean_step = WindowStats::compute(&steps).mean;
        (self.config.jump_threshold_base + self.config.jump_threshold_gain * mean_step)
            .clamp(self.config.jump_threshold_min, self.config.jump_threshold_max)
    }

    /// Stability score in [0, 1] from the variance of recent displacements
    pub fn stability(&self) -> f64 {
        let steps = self.steps(self.config.stability_steps + 1);
        if steps.len() < 2 {
            return 0.5;
        }
        let variance = WindowStats::compute(&steps).variance();
        1.0 / (1.0 + variance / self.config.stability_scale)
    }

    /// Up to `count` most recent accepted raw points, newest first
    pub fn recent_raw(&self, count: usize) -> Vec<(f64, f64)> {
        self.history.read_last(count).into_iter().map(|o| o.raw).collect()
    }

    /// Accepted observations, oldest first
    pub fn history(&self) -> impl Iterator<Item = &GazeObservation> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn stats(&self) -> StabilizerStats {
        self.stats
    }

    /// Drop history, smoothing state and the current estimate
    pub fn clear(&mut self) {
        self.history.clear();
        self.left_eyes.clear();
        self.right_eyes.clear();
        self.confidences.clear();
        self.smoother.reset();
        self.validator.reset();
        self.consecutive_rejections = 0;
        self.estimate = None;
    }

    /// Displacements between the last `samples` accepted positions
    fn steps(&self, samples: usize) -> Vec<f64> {
        let skip = self.history.len().saturating_sub(samples);
        let recent: Vec<(f64, f64)> = self.history.iter().skip(skip).map(|o| o.screen).collect();
        recent.windows(2).map(|w| distance(w[0], w[1])).collect()
    }

    fn refresh(&mut self, timestamp_ms: u64) {
        let Some(latest) = self.history.latest().copied() else {
            self.estimate = None;
            return;
        };
        let smoothed = self.smoother.value().unwrap_or(latest.screen);
        let (x, y) = match self.config.mode {
            SmoothingMode::Smoothed => smoothed,
            SmoothingMode::Raw => latest.screen,
        };
        let stability = self.stability();
        let detection = WindowStats::compute(&self.confidences.iter().copied().collect::<Vec<_>>()).mean;
        self.estimate = Some(GazeEstimate {
            x,
            y,
            screen_raw: latest.screen,
            raw: latest.raw,
            confidence: (detection * (0.5 + 0.5 * stability)).clamp(0.0, 1.0),
            stability,
            timestamp_ms,
        });
    }
}

impl Default for GazeStabilizer {
    fn default() -> Self {
        Self {
            config: StabilizerConfig::default(),
            history: RingBuffer::with_default_capacity(),
            left_eyes: RingBuffer::with_default_capacity(),
            right_eyes: RingBuffer::with_default_capacity(),
            confidences: RingBuffer::with_default_capacity(),
            smoother: PointSmoother::new(StabilizerConfig::default().smoothing_alpha),
            validator: ObservationValidator::default(),
            consecutive_rejections: 0,
            estimate: None,
            stats: StabilizerStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obs(x: f64, y: f64, t: u64) -> GazeObservation {
        GazeObservation {
            raw: (x / 1920.0, y / 1080.0),
            screen: (x, y),
            confidence: 0.9,
            timestamp_ms: t,
        }
    }

    fn settled() -> GazeStabilizer {
        let mut stabilizer = GazeStabilizer::default();
        for i in 0..10u64 {
            let jitter = (i % 2) as f64;
            assert_eq!(stabilizer.push(obs(500.0 + jitter, 500.0, i * 33)), SampleOutcome::Accepted);
        }
        stabilizer
    }

    #[test]
    fn test_smoothing() {
        let mut stabilizer = GazeStabilizer::default();
        stabilizer.push(obs(100.0, 100.0, 0));
        stabilizer.push(obs(200.0, 100.0, 33));
        let estimate = stabilizer.estimate().unwrap();
        assert!((estimate.x - 130.0).abs() < 1e-9);
        assert_eq!(estimate.screen_raw, (200.0, 100.0));
    }

    #[test]
    fn test_raw_mode_bypasses_smoothing() {
        let mut stabilizer = GazeStabilizer::default();
        stabilizer.set_mode(SmoothingMode::Raw);
        stabilizer.push(obs(100.0, 100.0, 0));
        stabilizer.push(obs(200.0, 150.0, 33));
        assert_eq!(stabilizer.estimate().unwrap().position(), (200.0, 150.0));
    }

    #[test]
    fn test_outlier_leaves_history_unchanged() {
        let mut stabilizer = settled();
        let before: Vec<GazeObservation> = stabilizer.history().copied().collect();
        let estimate_before = stabilizer.estimate();

        let outcome = stabilizer.push(obs(1100.0, 500.0, 400));
        assert!(matches!(outcome, SampleOutcome::Rejected { displacement, .. } if displacement > 500.0));

        let after: Vec<GazeObservation> = stabilizer.history().copied().collect();
        assert_eq!(before, after);
        assert_eq!(stabilizer.estimate(), estimate_before);
        assert_eq!(stabilizer.stats().rejected, 1);
    }

    #[test]
    fn test_threshold_adapts_to_motion() {
        let stabilizer = settled();
        // Mean step of 1px barely raises the floor
        assert!((stabilizer.jump_threshold() - 252.0).abs() < 1e-9);

        let mut moving = GazeStabilizer::default();
        for i in 0..8u64 {
            moving.push(obs(100.0 + 100.0 * i as f64, 500.0, i * 33));
        }
        assert!((moving.jump_threshold() - 450.0).abs() < 1e-9);

        let mut fast = GazeStabilizer::default();
        for i in 0..4u64 {
            fast.push(obs(100.0 + 240.0 * i as f64, 500.0, i * 33));
        }
        assert_eq!(fast.jump_threshold(), 500.0);
    }

    #[test]
    fn test_reanchors_after_repeated_rejections() {
        let mut stabilizer = settled();
        for i in 0..5u64 {
            let outcome = stabilizer.push(obs(1500.0, 800.0, 400 + i * 33));
            assert!(matches!(outcome, SampleOutcome::Rejected { .. }));
        }
        assert_eq!(stabilizer.push(obs(1500.0, 800.0, 600)), SampleOutcome::Reanchored);
        assert_eq!(stabilizer.history_len(), 1);
        assert_eq!(stabilizer.estimate().unwrap().position(), (1500.0, 800.0));
    }

    #[test]
    fn test_invalid_observations_are_counted() {
        let mut stabilizer = settled();
        let outcome = stabilizer.push(obs(f64::NAN, 500.0, 400));
        assert!(matches!(outcome, SampleOutcome::Invalid(FilterError::NonFinite { .. })));

        let origin = GazeObservation {
            raw: (0.0, 0.0),
            screen: (500.0, 500.0),
            confidence: 0.9,
            timestamp_ms: 433,
        };
        assert_eq!(stabilizer.push(origin), SampleOutcome::Accepted);
        assert_eq!(
            stabilizer.push(GazeObservation { timestamp_ms: 466, ..origin }),
            SampleOutcome::Invalid(FilterError::RepeatedOrigin)
        );
        assert_eq!(stabilizer.stats().invalid, 2);
        assert_eq!(stabilizer.history_len(), 10);
    }

    #[test]
    fn test_confidence_drops_to_zero_without_detections() {
        let mut stabilizer = settled();
        assert!(stabilizer.estimate().unwrap().confidence > 0.5);
        for i in 0..10u64 {
            stabilizer.record_miss(400 + i * 33);
        }
        assert_eq!(stabilizer.estimate().unwrap().confidence, 0.0);
        assert_eq!(stabilizer.stats().missing, 10);
    }

    #[test]
    fn test_stability_prefers_steady_motion() {
        let steady = settled();
        let mut jittery = GazeStabilizer::default();
        for (i, dx) in [0.0, 5.0, 0.0, 90.0, 85.0, 0.0, 2.0].iter().enumerate() {
            jittery.push(obs(500.0 + dx, 500.0, i as u64 * 33));
        }
        assert!(steady.stability() > 0.9);
        assert!(jittery.stability() < 0.2);
        assert!(steady.estimate().unwrap().confidence > jittery.estimate().unwrap().confidence);
    }

    #[test]
    fn test_clear() {
        let mut stabilizer = settled();
        stabilizer.clear();
        assert!(stabilizer.estimate().is_none());
        assert_eq!(stabilizer.history_len(), 0);
        assert_eq!(stabilizer.push(obs(1500.0, 800.0, 0)), SampleOutcome::Accepted);
    }

    #[test]
    fn test_recent_raw_newest_first() {
        let mut stabilizer = GazeStabilizer::default();
        for i in 0..4u64 {
            stabilizer.push(obs(100.0 * (i + 1) as f64, 0.0, i));
        }
        let raw = stabilizer.recent_raw(2);
        assert_eq!(raw.len(), 2);
        assert!(raw[0].0 > raw[1].0);
    }

    #[test]
    fn test_single_eye_rebuilt_from_offset() {
        let mut stabilizer = GazeStabilizer::default();
        assert_eq!(stabilizer.combine_eyes(Some((0.3, 0.35)), None), None);

        for _ in 0..3 {
            let mid = stabilizer.combine_eyes(Some((0.275, 0.35)), Some((0.725, 0.36))).unwrap();
            assert!((mid.0 - 0.5).abs() < 1e-9);
        }
        let (dx, dy) = stabilizer.eye_offset().unwrap();
        assert!((dx - 0.45).abs() < 1e-9 && (dy - 0.01).abs() < 1e-9);

        // Gaze moved right by 0.02 while the right eye is hidden
        let from_left = stabilizer.combine_eyes(Some((0.295, 0.35)), None).unwrap();
        assert!((from_left.0 - 0.52).abs() < 1e-9);
        assert!((from_left.1 - 0.355).abs() < 1e-9);
        let from_right = stabilizer.combine_eyes(None, Some((0.745, 0.36))).unwrap();
        assert!((from_right.0 - 0.52).abs() < 1e-9);

        assert_eq!(stabilizer.combine_eyes(None, Some((f64::NAN, 0.3))), None);
        stabilizer.clear();
        assert!(stabilizer.eye_offset().is_none());
    }

    proptest! {
        #[test]
        fn test_large_jump_never_accepted(dx in 501.0f64..1500.0, dy in -1.0f64..1.0) {
            let mut stabilizer = settled();
            let average = stabilizer.rolling_average().unwrap();
            let len = stabilizer.history_len();
            let outcome = stabilizer.push(obs(average.0 + dx, average.1 + dy, 400));
            let rejected = matches!(outcome, SampleOutcome::Rejected { .. });
            prop_assert!(rejected);
            prop_assert_eq!(stabilizer.history_len(), len);
        }
    }
}
