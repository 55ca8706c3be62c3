//! Gaze Selection
//!
//! Turns a stabilized gaze point or a head pose into committed selections:
//! - `DwellSelector`: hover a target until the dwell time elapses
//! - `ZoneSelector`: pick one cell of a 3x3 grid from yaw/pitch
//!
//! Both return `SelectionEvent`s which the host forwards to a `SelectionSink`.

mod config;
mod dwell;
mod sink;
mod target;
mod zone;

pub use config::{DwellConfig, ZoneConfig};
pub use dwell::{DwellPhase, DwellSelector, DwellState};
pub use sink::{SelectionEvent, SelectionLog, SelectionSink, SelectionTarget};
pub use target::{DwellTarget, TargetShape};
pub use zone::{Zone, ZoneBounds, ZoneSelector, ZONE_COUNT};

use thiserror::Error;

/// Selection error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Unsupported zone grid size {0} (only 3 is supported)")]
    InvalidGridSize(usize),

    #[error("Invalid target {id}: {reason}")]
    InvalidTarget { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
