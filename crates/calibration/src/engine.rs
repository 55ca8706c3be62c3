//! Calibration state machine
//!
//! `Idle → Running(point) → Validating(point) → Complete`, or `Cancelled`.
//! The engine is driven by stabilized gaze estimates, one call per frame.
//! All per-session state lives in one `Session` value that `start`, `cancel`
//! and `reset` replace wholesale, so nothing from an old session can fire
//! into a new one.

use crate::accuracy::{score_points, CalibrationAccuracy, PointAccuracy};
use crate::config::{CalibrationConfig, GateReference};
use crate::error::CalibrationError;
use crate::persistence::CalibrationProfile;
use crate::points::{calibration_points, validation_points, CalibrationPoint};
use crate::transform::{CalibrationSample, CalibrationTransform};
use gaze_filter::{GazeEstimate, StabilityGate};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationState {
    #[default]
    Idle,
    Running { point_index: usize },
    Validating { point_index: usize },
    Complete,
    Cancelled,
}

/// Terminal result of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub success: bool,
    pub accuracy: CalibrationAccuracy,
    /// Accuracy fell below the configured threshold; the host decides
    pub recalibration_recommended: bool,
    /// Calibration points that contributed samples
    pub points_used: usize,
    pub timed_out_points: usize,
    pub failure: Option<String>,
}

impl CalibrationOutcome {
    fn failed(reason: String, points_used: usize, timed_out_points: usize) -> Self {
        Self {
            success: false,
            accuracy: CalibrationAccuracy::default(),
            recalibration_recommended: true,
            points_used,
            timed_out_points,
            failure: Some(reason),
        }
    }
}

/// Progress and lifecycle notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationEvent {
    Started { session: u64, point_count: usize },
    PointStarted { session: u64, index: usize, target: CalibrationPoint },
    PointProgress { session: u64, index: usize, progress: f64 },
    PointCompleted { session: u64, index: usize, samples: usize },
    /// The point never stabilized; whatever samples existed were kept
    PointTimedOut { session: u64, index: usize, samples: usize },
    ValidationStarted { session: u64, point_count: usize },
    ValidationPoint { session: u64, index: usize, target: CalibrationPoint },
    ValidationProgress { session: u64, index: usize, progress: f64 },
    Finished { session: u64, outcome: CalibrationOutcome },
    Cancelled { session: u64 },
}

impl CalibrationEvent {
    pub fn session(&self) -> u64 {
        match self {
            Self::Started { session, .. }
            | Self::PointStarted { session, .. }
            | Self::PointProgress { session, .. }
            | Self::PointCompleted { session, .. }
            | Self::PointTimedOut { session, .. }
            | Self::ValidationStarted { session, .. }
            | Self::ValidationPoint { session, .. }
            | Self::ValidationProgress { session, .. }
            | Self::Finished { session, .. }
            | Self::Cancelled { session } => *session,
        }
    }

    /// Whether the host should clear the gaze stabilizer history
    pub fn starts_point(&self) -> bool {
        matches!(self, Self::PointStarted { .. } | Self::ValidationPoint { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct RawReading {
    raw: (f64, f64),
    confidence: f64,
    timestamp_ms: u64,
}

/// Timers and buffers of the current point
#[derive(Debug)]
struct PointState {
    started_ms: u64,
    last_ms: Option<u64>,
    stable_ms: u64,
    /// Input lock after completion, until the next point starts
    locked_until: Option<u64>,
    last_position: Option<(f64, f64)>,
    stable_raw: RingBuffer<RawReading>,
    recent_raw: RingBuffer<RawReading>,
}

impl PointState {
    fn new(now_ms: u64, burst: usize) -> Self {
        Self {
            started_ms: now_ms,
            last_ms: None,
            stable_ms: 0,
            locked_until: None,
            last_position: None,
            stable_raw: RingBuffer::with_capacity(burst),
            recent_raw: RingBuffer::with_capacity(burst),
        }
    }
}

#[derive(Debug)]
struct Session {
    id: u64,
    points: Vec<CalibrationPoint>,
    samples: Vec<CalibrationSample>,
    timed_out: usize,
    point: PointState,
    fitted: Option<CalibrationTransform>,
    validation_targets: Vec<CalibrationPoint>,
    validation: Vec<PointAccuracy>,
}

impl Session {
    fn points_with_samples(&self) -> usize {
        let mut ids: Vec<usize> = self.samples.iter().map(|s| s.point_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Calibration session driver
#[derive(Debug)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    gate: StabilityGate,
    state: CalibrationState,
    session: Option<Session>,
    last_session_id: u64,
    transform: Option<CalibrationTransform>,
    accuracy: Option<CalibrationAccuracy>,
    point_count: usize,
    last_outcome: Option<CalibrationOutcome>,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Result<Self, CalibrationError> {
        config.validate()?;
        let gate = StabilityGate::new(config.gate.clone()).map_err(|e| CalibrationError::Config(e.to_string()))?;
        Ok(Self {
            config,
            gate,
            state: CalibrationState::Idle,
            session: None,
            last_session_id: 0,
            transform: None,
            accuracy: None,
            point_count: 0,
            last_outcome: None,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Running or validating
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            CalibrationState::Running { .. } | CalibrationState::Validating { .. }
        )
    }

    pub fn session_id(&self) -> u64 {
        self.last_session_id
    }

    pub fn transform(&self) -> Option<&CalibrationTransform> {
        self.transform.as_ref()
    }

    pub fn accuracy(&self) -> Option<CalibrationAccuracy> {
        self.accuracy
    }

    pub fn last_outcome(&self) -> Option<&CalibrationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Map a raw point with the active transform
    pub fn apply(&self, raw: (f64, f64)) -> Option<(f64, f64)> {
        self.transform.map(|t| t.apply(raw))
    }

    /// Target the user should look at right now
    pub fn current_target(&self) -> Option<CalibrationPoint> {
        let session = self.session.as_ref()?;
        match self.state {
            CalibrationState::Running { point_index } => session.points.get(point_index).copied(),
            CalibrationState::Validating { point_index } => session.validation_targets.get(point_index).copied(),
            _ => None,
        }
    }

    /// Start a new session, replacing any session in progress
    pub fn start(&mut self, now_ms: u64) -> Vec<CalibrationEvent> {
        if let Some(old) = &self.session {
            info!("Calibration session {} replaced by a new session", old.id);
        }
        self.last_session_id += 1;
        let id = self.last_session_id;
        let points = calibration_points(self.config.mode);
        let first = points[0];
        let point_count = points.len();

        self.gate.clear();
        self.session = Some(Session {
            id,
            points,
            samples: Vec::new(),
            timed_out: 0,
            point: PointState::new(now_ms, self.config.burst_samples),
            fitted: None,
            validation_targets: Vec::new(),
            validation: Vec::new(),
        });
        self.state = CalibrationState::Running { point_index: 0 };
        info!("Calibration session {} started ({:?}, {} points)", id, self.config.mode, point_count);

        vec![
            CalibrationEvent::Started { session: id, point_count },
            CalibrationEvent::PointStarted {
                session: id,
                index: 0,
                target: first,
            },
        ]
    }

    /// Abort the running session, discarding its samples and timers
    pub fn cancel(&mut self) -> Option<CalibrationEvent> {
        if !self.is_active() {
            return None;
        }
        let session = self.session.take()?;
        self.gate.clear();
        self.state = CalibrationState::Cancelled;
        info!("Calibration session {} cancelled", session.id);
        Some(CalibrationEvent::Cancelled { session: session.id })
    }

    /// Drop the active transform and any session
    pub fn reset(&mut self) {
        self.session = None;
        self.gate.clear();
        self.transform = None;
        self.accuracy = None;
        self.point_count = 0;
        self.last_outcome = None;
        self.state = CalibrationState::Idle;
        info!("Calibration reset");
    }

    /// Feed one frame. `None` means no usable gaze this frame.
    pub fn update(&mut self, estimate: Option<&GazeEstimate>, now_ms: u64) -> Vec<CalibrationEvent> {
        let mut events = Vec::new();
        match self.state {
            CalibrationState::Running { point_index } => self.update_point(point_index, estimate, now_ms, &mut events),
            CalibrationState::Validating { point_index } => {
                self.update_validation(point_index, estimate, now_ms, &mut events)
            }
            _ => {}
        }
        events
    }

    fn update_point(
        &mut self,
        index: usize,
        estimate: Option<&GazeEstimate>,
        now_ms: u64,
        events: &mut Vec<CalibrationEvent>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let config = &self.config;
        let Some(target) = session.points.get(index).copied() else {
            return;
        };
        let point = &mut session.point;

        if let Some(until) = point.locked_until {
            if now_ms >= until {
                self.advance(now_ms, events);
            }
            return;
        }

        if let Some(est) = estimate.filter(|e| e.x.is_finite() && e.y.is_finite()) {
            let reading = RawReading {
                raw: est.raw,
                confidence: est.confidence,
                timestamp_ms: now_ms,
            };
            point.recent_raw.push(reading);

            let position = est.position();
            let reference = match config.gate_reference {
                GateReference::Target => target.to_screen(config.viewport),
                GateReference::Fixation => point.last_position.unwrap_or(position),
            };
            point.last_position = Some(position);

            let threshold = config.accuracy_threshold_px;
            let report = self.gate.observe(now_ms, position, reference, threshold);
            let elapsed = point
                .last_ms
                .map_or(0, |last| now_ms.saturating_sub(last).min(config.max_frame_gap_ms));
            if report.stable {
                point.stable_ms += elapsed;
                point.stable_raw.push(reading);
            } else {
                point.stable_ms = 0;
            }
            point.last_ms = Some(now_ms);

            let mut required = config.required_stable_ms as f64;
            if report.distance < 0.5 * threshold {
                required *= config.adaptive_factor;
            }
            let progress = (point.stable_ms as f64 / required).min(1.0);
            events.push(CalibrationEvent::PointProgress {
                session: session.id,
                index,
                progress,
            });

            if progress >= 1.0 {
                let samples = burst(&point.stable_raw, config.burst_samples, &target, false);
                let count = samples.len();
                session.samples.extend(samples);
                point.locked_until = Some(now_ms + config.settle_ms);
                info!("Calibration point {} complete ({} samples)", index, count);
                events.push(CalibrationEvent::PointCompleted {
                    session: session.id,
                    index,
                    samples: count,
                });
                return;
            }
        } else {
            point.last_ms = Some(now_ms);
        }

        if now_ms.saturating_sub(point.started_ms) >= config.point_timeout_ms() {
            let source = if point.stable_raw.is_empty() {
                &point.recent_raw
            } else {
                &point.stable_raw
            };
            let samples = burst(source, config.burst_samples, &target, true);
            let count = samples.len();
            session.samples.extend(samples);
            session.timed_out += 1;
            warn!(
                "Calibration point {} timed out after {}ms, kept {} low-confidence samples",
                index,
                config.point_timeout_ms(),
                count
            );
            events.push(CalibrationEvent::PointTimedOut {
                session: session.id,
                index,
                samples: count,
            });
            self.advance(now_ms, events);
        }
    }

    /// Move to the next calibration point, or fit once all are done
    fn advance(&mut self, now_ms: u64, events: &mut Vec<CalibrationEvent>) {
        let CalibrationState::Running { point_index } = self.state else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let next = point_index + 1;
        let next_target = session.points.get(next).copied();
        self.gate.clear();

        match next_target {
            Some(target) => {
                session.point = PointState::new(now_ms, self.config.burst_samples);
                self.state = CalibrationState::Running { point_index: next };
                debug!("Calibration point {} at ({:.2}, {:.2})", next, target.x, target.y);
                events.push(CalibrationEvent::PointStarted {
                    session: session.id,
                    index: next,
                    target,
                });
            }
            None => self.finish_points(now_ms, events),
        }
    }

    fn finish_points(&mut self, now_ms: u64, events: &mut Vec<CalibrationEvent>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let fitted = CalibrationTransform::fit(&session.samples, self.config.fit_model);
        let points_used = session.points_with_samples();
        let timed_out = session.timed_out;

        match fitted {
            Err(e) => {
                warn!("Calibration fit failed: {}", e);
                self.finish(CalibrationOutcome::failed(e.to_string(), points_used, timed_out), events);
            }
            Ok(transform) if self.config.skip_validation => {
                let accuracy = accuracy_from_samples(&transform, &session.samples, &self.config);
                self.complete(transform, accuracy, events);
            }
            Ok(transform) => {
                let targets = validation_points();
                session.validation = targets.iter().map(|p| PointAccuracy::new((p.x, p.y))).collect();
                session.fitted = Some(transform);
                session.point = PointState::new(now_ms, self.config.burst_samples);
                let first = targets[0];
                let count = targets.len();
                session.validation_targets = targets;
                self.state = CalibrationState::Validating { point_index: 0 };
                info!("Calibration fitted, validating with {} points", count);
                events.push(CalibrationEvent::ValidationStarted {
                    session: session.id,
                    point_count: count,
                });
                events.push(CalibrationEvent::ValidationPoint {
                    session: session.id,
                    index: 0,
                    target: first,
                });
            }
        }
    }

    fn update_validation(
        &mut self,
        index: usize,
        estimate: Option<&GazeEstimate>,
        now_ms: u64,
        events: &mut Vec<CalibrationEvent>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(transform) = session.fitted else {
            return;
        };
        let config = &self.config.validation;
        let elapsed = now_ms.saturating_sub(session.point.started_ms);
        let Some(measured) = session.validation.get_mut(index) else {
            return;
        };

        if elapsed >= config.settle_ms {
            match estimate {
                Some(e) if e.confidence >= config.min_confidence && e.raw.0.is_finite() && e.raw.1.is_finite() => {
                    measured.mapped.push(transform.apply(e.raw));
                }
                _ => measured.invalid += 1,
            }
        }

        let progress = (elapsed as f64 / config.duration_ms.max(1) as f64).min(1.0);
        events.push(CalibrationEvent::ValidationProgress {
            session: session.id,
            index,
            progress,
        });
        if elapsed < config.duration_ms {
            return;
        }

        let next = index + 1;
        match session.validation_targets.get(next).copied() {
            Some(target) => {
                session.point = PointState::new(now_ms, self.config.burst_samples);
                self.state = CalibrationState::Validating { point_index: next };
                events.push(CalibrationEvent::ValidationPoint {
                    session: session.id,
                    index: next,
                    target,
                });
            }
            None => {
                let accuracy = score_points(&session.validation, self.config.viewport, &self.config.validation);
                self.complete(transform, accuracy, events);
            }
        }
    }

    /// Install a fitted transform and finish successfully
    fn complete(&mut self, transform: CalibrationTransform, accuracy: CalibrationAccuracy, events: &mut Vec<CalibrationEvent>) {
        let (points_used, timed_out) = self
            .session
            .as_ref()
            .map_or((0, 0), |s| (s.points_with_samples(), s.timed_out));
        let recommended = accuracy.overall < self.config.validation.recalibration_threshold;
        if recommended {
            warn!(
                "Calibration accuracy {:.2} below {:.2}, recalibration recommended",
                accuracy.overall, self.config.validation.recalibration_threshold
            );
        }

        self.transform = Some(transform);
        self.accuracy = Some(accuracy);
        self.point_count = points_used;
        self.finish(
            CalibrationOutcome {
                success: true,
                accuracy,
                recalibration_recommended: recommended,
                points_used,
                timed_out_points: timed_out,
                failure: None,
            },
            events,
        );
    }

    fn finish(&mut self, outcome: CalibrationOutcome, events: &mut Vec<CalibrationEvent>) {
        let session = self.session.take().map_or(self.last_session_id, |s| s.id);
        self.gate.clear();
        self.state = CalibrationState::Complete;
        info!(
            "Calibration session {} finished: success={} overall={:.3}",
            session, outcome.success, outcome.accuracy.overall
        );
        self.last_outcome = Some(outcome.clone());
        events.push(CalibrationEvent::Finished { session, outcome });
    }

    /// Snapshot of the active calibration for the host to store
    pub fn profile(&self, created_at_ms: u64) -> Option<CalibrationProfile> {
        let transform = self.transform?;
        let accuracy = self.accuracy.unwrap_or_default();
        Some(CalibrationProfile::new(transform, accuracy, created_at_ms, self.point_count))
    }

    /// Install a stored calibration
    pub fn load_profile(&mut self, profile: &CalibrationProfile) -> Result<(), CalibrationError> {
        if self.is_active() {
            return Err(CalibrationError::SessionActive);
        }
        if profile.version != crate::PROFILE_VERSION {
            return Err(CalibrationError::UnsupportedVersion {
                found: profile.version,
                expected: crate::PROFILE_VERSION,
            });
        }
        if profile.transform.scale_x == 0.0 || profile.transform.scale_y == 0.0 {
            return Err(CalibrationError::ZeroScale(if profile.transform.scale_x == 0.0 { "x" } else { "y" }));
        }
        self.transform = Some(profile.transform);
        self.accuracy = Some(profile.accuracy);
        self.point_count = profile.point_count;
        self.state = CalibrationState::Complete;
        info!("Loaded calibration profile ({} points, overall {:.2})", profile.point_count, profile.accuracy.overall);
        Ok(())
    }
}

/// Up to `count` most recent readings as samples for `point`
fn burst(readings: &RingBuffer<RawReading>, count: usize, point: &CalibrationPoint, low_confidence: bool) -> Vec<CalibrationSample> {
    readings
        .read_last(count)
        .into_iter()
        .map(|r| CalibrationSample {
            point_id: point.id,
            target: (point.x, point.y),
            raw: r.raw,
            confidence: if low_confidence { r.confidence * 0.5 } else { r.confidence },
            timestamp_ms: r.timestamp_ms,
            low_confidence,
        })
        .collect()
}

/// Accuracy from the calibration samples themselves; timed-out samples count as invalid
fn accuracy_from_samples(
    transform: &CalibrationTransform,
    samples: &[CalibrationSample],
    config: &CalibrationConfig,
) -> CalibrationAccuracy {
    let mut by_point: BTreeMap<usize, PointAccuracy> = BTreeMap::new();
    for s in samples {
        let entry = by_point.entry(s.point_id).or_insert_with(|| PointAccuracy::new(s.target));
        if s.low_confidence {
            entry.invalid += 1;
        } else {
            entry.mapped.push(transform.apply(s.raw));
        }
    }
    let points: Vec<PointAccuracy> = by_point.into_values().collect();
    score_points(&points, config.viewport, &config.validation)
}
