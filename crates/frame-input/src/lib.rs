//! Frame Input Library for Gaze Selection
//!
//! Provides the data handed over by the capture collaborator:
//! - RGBA frames with structural validation
//! - Face boxes and head poses supplied by external detectors
//! - Synthetic face scenes for tests, benches and the demo host

pub mod frame;
pub mod region;
pub mod synthetic;

pub use frame::{Frame, BYTES_PER_PIXEL};
pub use region::{FaceRegion, HeadPose, PixelRect};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame error types
///
/// Only structurally invalid input is an error; everything else the
/// pipeline recovers from per frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}

/// Capture configuration advertised by the frame source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CaptureConfig {
    /// Low resolution webcam profile
    pub fn low_res() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 30,
        }
    }

    /// Interval between frames in milliseconds
    pub fn frame_interval_ms(&self) -> u64 {
        1000 / u64::from(self.fps.max(1))
    }
}
