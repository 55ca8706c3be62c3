//! Per-tick orchestration
//!
//! One call to [`GazePipeline::process_frame`] per camera frame: face region,
//! pupils, stabilization, then either the running calibration or the active
//! selector. Everything runs synchronously on the caller's thread.

use crate::config::{PipelineConfig, SelectionMode};
use crate::governor::ResolutionGovernor;
use crate::provider::FaceBoxProvider;
use crate::result::{DebugFrame, FrameIssue, FrameResult};
use crate::PipelineError;
use calibration::{CalibrationAccuracy, CalibrationEngine, CalibrationEvent, CalibrationProfile, CalibrationState};
use eye_detect::{EyeDetection, EyePair, FaceRegionEstimator, PoseEstimator, PupilDetector};
use frame_input::{FaceRegion, Frame};
use gaze_filter::{GazeEstimate, GazeObservation, GazeStabilizer, SampleOutcome, SmoothingMode};
use metrics::{counter, gauge, histogram};
use selection::{DwellSelector, DwellTarget, SelectionEvent, SelectionSink, ZoneConfig, ZoneSelector};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Gaze pipeline: detection, stabilization, calibration and selection
pub struct GazePipeline {
    config: PipelineConfig,
    face_estimator: FaceRegionEstimator,
    pupils: PupilDetector,
    pose: PoseEstimator,
    stabilizer: GazeStabilizer,
    calibration: CalibrationEngine,
    dwell: DwellSelector,
    zone: ZoneSelector,
    governor: ResolutionGovernor,
    face_provider: Option<Box<dyn FaceBoxProvider + Send>>,
    sink: Option<Box<dyn SelectionSink + Send>>,
    last_timestamp: Option<u64>,
    frames: u64,
}

/// Detection stage output, in working-image pixels
struct Detection {
    face: Option<FaceRegion>,
    eyes: Option<EyePair>,
    outcome: SampleOutcome,
}

impl GazePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let pipeline = Self {
            face_estimator: FaceRegionEstimator::new(config.detector.face.clone()),
            pupils: PupilDetector::new(config.detector.pupil.clone())?,
            pose: PoseEstimator::new(config.detector.pose.clone()),
            stabilizer: GazeStabilizer::new(config.stabilizer.clone())?,
            calibration: CalibrationEngine::new(config.calibration.clone())?,
            dwell: DwellSelector::new(config.dwell.clone())?,
            zone: ZoneSelector::new(config.zone.clone())?,
            governor: ResolutionGovernor::new(config.resolution.clone()),
            face_provider: None,
            sink: None,
            last_timestamp: None,
            frames: 0,
            config,
        };
        info!(
            "Gaze pipeline initialized ({:?} mode, {:?} calibration, viewport {:?})",
            pipeline.config.mode, pipeline.config.calibration.mode, pipeline.config.calibration.viewport
        );
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a frame from a raw RGBA buffer and process it
    pub fn process_rgba(
        &mut self,
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ms: u64,
        face_box: Option<FaceRegion>,
    ) -> Result<FrameResult, PipelineError> {
        let mut frame = Frame::new(data, width, height, timestamp_ms)?;
        if let Some(face) = face_box {
            frame = frame.with_face_box(face);
        }
        self.process_frame(&frame)
    }

    /// Run one tick.
    ///
    /// Per-frame detection problems are reported in [`FrameResult::issues`];
    /// only a timestamp that goes backwards is an error.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameResult, PipelineError> {
        let started = Instant::now();
        let now = frame.timestamp_ms;
        if let Some(previous) = self.last_timestamp {
            if now < previous {
                return Err(PipelineError::NonMonotonicTimestamp { previous, current: now });
            }
        }
        self.last_timestamp = Some(now);
        self.frames += 1;
        counter!("gaze_frames_total").increment(1);

        let scale = self.governor.scale();
        let working: Cow<'_, Frame> = if scale > 1 {
            Cow::Owned(frame.downscale(scale))
        } else {
            Cow::Borrowed(frame)
        };
        let ratio = f64::from(working.width()) / f64::from(frame.width());

        let mut result = FrameResult {
            timestamp_ms: now,
            working_scale: scale,
            ..Default::default()
        };

        let detection = self.detect(frame, &working, ratio, &mut result.issues);
        let head_pose = frame.head_pose.or_else(|| match (&detection.face, &detection.eyes) {
            (Some(face), Some(eyes)) => self.pose.estimate(face, eyes),
            _ => None,
        });

        let fresh = matches!(detection.outcome, SampleOutcome::Accepted | SampleOutcome::Reanchored);
        let held = fresh || matches!(detection.outcome, SampleOutcome::Rejected { .. });
        let estimate = self.stabilizer.estimate().filter(|_| held);

        if self.calibration.is_active() {
            let fresh_estimate = estimate.filter(|_| fresh);
            let events = self.calibration.update(fresh_estimate.as_ref(), now);
            self.handle_calibration_events(&events);
            result.calibration_events = events;
        } else {
            result.selection_events = match self.config.mode {
                SelectionMode::Dwell => {
                    let confidence = estimate.map_or(0.0, |e| e.confidence);
                    self.dwell.update(estimate.map(|e| e.position()), confidence, now)
                }
                SelectionMode::Zone => self.zone.update(head_pose.as_ref(), now),
            };
            self.dispatch(&result.selection_events);
        }

        if self.config.debug_frames {
            result.debug = Some(self.debug_frame(&detection, estimate.as_ref(), &working, ratio));
        }

        result.face = detection.face.map(|f| f.scaled(1.0 / ratio));
        result.eyes = detection.eyes.map(|eyes| eyes.scaled(1.0 / ratio));
        result.head_pose = head_pose;
        result.gaze = estimate;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        result.processing_ms = elapsed_ms;
        histogram!("gaze_frame_processing_ms").record(elapsed_ms);
        if let Some(new_scale) = self.governor.record(elapsed_ms) {
            gauge!("gaze_working_scale").set(f64::from(new_scale));
        }
        Ok(result)
    }

    /// Face, pupils and the stabilizer update for one frame
    fn detect(&mut self, frame: &Frame, working: &Frame, ratio: f64, issues: &mut Vec<FrameIssue>) -> Detection {
        let now = frame.timestamp_ms;
        let provided = self.face_provider.as_mut().and_then(|p| p.face_box(frame));
        let face = match provided {
            Some(external) => external.scaled(ratio).clamp_to(working.width(), working.height()),
            None => self.face_estimator.estimate(working),
        };

        let Some(face) = face else {
            debug!("No face in frame at {}ms", now);
            counter!("gaze_frames_no_face_total").increment(1);
            issues.push(FrameIssue::NoFaceDetected);
            return Detection {
                face: None,
                eyes: None,
                outcome: self.stabilizer.record_miss(now),
            };
        };

        let eyes = self.pupils.detect(working, &face);
        let confidence = eyes.mean_confidence();
        let to_raw = |e: &EyeDetection| {
            e.is_valid()
                .then(|| ((e.x - face.x) / face.width, (e.y - face.y) / face.height))
        };
        let combined = if confidence >= self.config.min_detection_confidence {
            self.stabilizer.combine_eyes(to_raw(&eyes.left), to_raw(&eyes.right))
        } else {
            None
        };
        let outcome = match combined {
            Some(raw) => {
                let outcome = self.stabilizer.push(GazeObservation {
                    raw,
                    screen: self.project(raw),
                    confidence,
                    timestamp_ms: now,
                });
                if let SampleOutcome::Invalid(e) = &outcome {
                    issues.push(FrameIssue::InvalidFrameData { reason: e.to_string() });
                }
                outcome
            }
            None => {
                debug!(
                    "No usable eye point ({} eyes, confidence {:.2}) at {}ms",
                    eyes.detected_count(),
                    confidence,
                    now
                );
                issues.push(FrameIssue::LowConfidenceDetection { confidence });
                self.stabilizer.record_miss(now)
            }
        };

        Detection {
            face: Some(face),
            eyes: Some(eyes),
            outcome,
        }
    }

    /// Raw face-relative point to screen pixels
    fn project(&self, raw: (f64, f64)) -> (f64, f64) {
        let normalized = self
            .calibration
            .apply(raw)
            .unwrap_or_else(|| self.config.provisional.apply(raw));
        let (vw, vh) = self.config.calibration.viewport;
        (normalized.0 * vw, normalized.1 * vh)
    }

    fn handle_calibration_events(&mut self, events: &[CalibrationEvent]) {
        for event in events {
            if event.starts_point() {
                self.stabilizer.clear();
            }
            match event {
                CalibrationEvent::Finished { outcome, .. } => {
                    let label = if outcome.success { "true" } else { "false" };
                    counter!("gaze_calibrations_total", "success" => label).increment(1);
                    if outcome.success {
                        // Screen history was projected with the previous mapping
                        self.stabilizer.clear();
                        gauge!("gaze_calibration_accuracy").set(outcome.accuracy.overall);
                    } else {
                        warn!(
                            "Calibration failed: {}",
                            outcome.failure.as_deref().unwrap_or("accuracy below threshold")
                        );
                    }
                }
                CalibrationEvent::PointTimedOut { index, .. } => {
                    counter!("gaze_calibration_timeouts_total").increment(1);
                    debug!("Calibration point {} timed out", index);
                }
                _ => {}
            }
        }
    }

    fn dispatch(&mut self, events: &[SelectionEvent]) {
        for event in events {
            if let SelectionEvent::Selected { target, .. } = event {
                counter!("gaze_selections_total").increment(1);
                debug!("Selection committed: {:?}", target);
            }
            if let Some(sink) = self.sink.as_mut() {
                event.dispatch(sink.as_mut());
            }
        }
    }

    fn debug_frame(
        &self,
        detection: &Detection,
        estimate: Option<&GazeEstimate>,
        working: &Frame,
        ratio: f64,
    ) -> DebugFrame {
        let back = 1.0 / ratio;
        let to_frame = |(x, y): (f64, f64)| (x * back, y * back);
        let eye_boxes = detection.face.as_ref().map(|face| {
            self.pupils
                .eye_regions(face, working.width(), working.height())
                .map(|r| r.scaled(back))
        });
        let eyes = match &detection.eyes {
            Some(pair) => [pair.left, pair.right].map(|e| e.is_valid().then(|| to_frame(e.position()))),
            None => [None, None],
        };
        DebugFrame {
            face_box: detection.face.map(|f| f.scaled(back)),
            eye_boxes,
            eyes,
            gaze_point: estimate.map(|e| e.position()),
        }
    }

    /// Begin a calibration session; selection pauses until it ends
    pub fn start_calibration(&mut self, now_ms: u64) -> Vec<CalibrationEvent> {
        self.dwell.cancel();
        self.zone.cancel();
        self.stabilizer.clear();
        self.calibration.start(now_ms)
    }

    pub fn cancel_calibration(&mut self) -> Option<CalibrationEvent> {
        let event = self.calibration.cancel();
        if event.is_some() {
            self.stabilizer.clear();
        }
        event
    }

    /// Forget the calibration and return to the provisional mapping
    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
        self.stabilizer.clear();
    }

    pub fn load_profile(&mut self, profile: &CalibrationProfile) -> Result<(), PipelineError> {
        self.calibration.load_profile(profile)?;
        self.stabilizer.clear();
        Ok(())
    }

    /// Active calibration as a storable profile
    pub fn profile(&self, created_at_ms: u64) -> Option<CalibrationProfile> {
        self.calibration.profile(created_at_ms)
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    pub fn calibration_accuracy(&self) -> Option<CalibrationAccuracy> {
        self.calibration.accuracy()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.transform().is_some()
    }

    /// Target to draw while a calibration or accuracy test runs, in screen pixels
    pub fn calibration_target(&self) -> Option<(f64, f64)> {
        self.calibration
            .current_target()
            .map(|p| p.to_screen(self.config.calibration.viewport))
    }

    pub fn set_targets(&mut self, targets: Vec<DwellTarget>) -> Result<(), PipelineError> {
        self.dwell.set_targets(targets)?;
        Ok(())
    }

    pub fn set_zone_config(&mut self, config: ZoneConfig) -> Result<(), PipelineError> {
        self.zone.set_zone_config(config.clone())?;
        self.config.zone = config;
        Ok(())
    }

    /// Switch selectors; both start from a clean dwell
    pub fn set_mode(&mut self, mode: SelectionMode) {
        if mode != self.config.mode {
            info!("Selection mode {:?} -> {:?}", self.config.mode, mode);
            self.dwell.cancel();
            self.zone.cancel();
            self.config.mode = mode;
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.config.mode
    }

    pub fn set_smoothing(&mut self, mode: SmoothingMode) {
        self.stabilizer.set_mode(mode);
        self.config.stabilizer.mode = mode;
    }

    pub fn set_sink(&mut self, sink: Box<dyn SelectionSink + Send>) {
        self.sink = Some(sink);
    }

    pub fn set_face_provider(&mut self, provider: Box<dyn FaceBoxProvider + Send>) {
        self.face_provider = Some(provider);
    }

    /// Abort any dwell in progress
    pub fn cancel_selection(&mut self) {
        self.dwell.cancel();
        self.zone.cancel();
    }

    pub fn dwell(&self) -> &DwellSelector {
        &self.dwell
    }

    pub fn zone(&self) -> &ZoneSelector {
        &self.zone
    }

    pub fn stabilizer(&self) -> &GazeStabilizer {
        &self.stabilizer
    }

    pub fn working_scale(&self) -> u32 {
        self.governor.scale()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }
}
