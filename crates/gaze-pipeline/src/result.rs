//! Per-tick output

use calibration::CalibrationEvent;
use eye_detect::EyePair;
use frame_input::{FaceRegion, HeadPose, PixelRect};
use gaze_filter::GazeEstimate;
use selection::SelectionEvent;
use serde::{Deserialize, Serialize};

/// Recoverable per-frame problems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameIssue {
    NoFaceDetected,
    /// No pupil found, a lone eye with no remembered pair, or the eyes scored below the confidence floor
    LowConfidenceDetection { confidence: f64 },
    /// Detector output rejected as non-finite, stuck at the origin or out of range
    InvalidFrameData { reason: String },
}

/// Geometry for overlay drawing, in full-resolution frame pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugFrame {
    pub face_box: Option<FaceRegion>,
    pub eye_boxes: Option<[PixelRect; 2]>,
    /// Pupil centers, `None` for a missed eye
    pub eyes: [Option<(f64, f64)>; 2],
    /// Stabilized screen point
    pub gaze_point: Option<(f64, f64)>,
}

/// Everything one tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameResult {
    pub timestamp_ms: u64,
    /// Face region in full-resolution frame pixels
    pub face: Option<FaceRegion>,
    /// Eye detections and search regions in full-resolution frame pixels
    pub eyes: Option<EyePair>,
    pub head_pose: Option<HeadPose>,
    /// Stabilized gaze, `None` when this frame produced no usable sample
    pub gaze: Option<GazeEstimate>,
    pub calibration_events: Vec<CalibrationEvent>,
    pub selection_events: Vec<SelectionEvent>,
    pub issues: Vec<FrameIssue>,
    pub debug: Option<DebugFrame>,
    /// Downscale factor used for this frame
    pub working_scale: u32,
    pub processing_ms: f64,
}

impl FrameResult {
    pub fn has_issue(&self, issue: &FrameIssue) -> bool {
        self.issues
            .iter()
            .any(|i| std::mem::discriminant(i) == std::mem::discriminant(issue))
    }
}
