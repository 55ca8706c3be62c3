//! Selection events and the sink collaborator

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// What a dwell is on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionTarget {
    /// Dwell target id
    Target(String),
    /// Zone id, `row * 3 + col`
    Zone(usize),
}

/// Output of a selector tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// Dwell progress in [0, 1]; 0 after a reset
    DwellProgress {
        target: SelectionTarget,
        progress: f64,
        /// Gaze fell inside more than one target; the last one won
        ambiguous: bool,
    },
    Selected { target: SelectionTarget, timestamp_ms: u64 },
}

impl SelectionEvent {
    pub fn target(&self) -> &SelectionTarget {
        match self {
            Self::DwellProgress { target, .. } | Self::Selected { target, .. } => target,
        }
    }

    /// Forward to the matching sink callback
    pub fn dispatch(&self, sink: &mut dyn SelectionSink) {
        match self {
            Self::DwellProgress { target, progress, .. } => sink.on_dwell_progress(target, *progress),
            Self::Selected { target, .. } => sink.on_select(target),
        }
    }
}

/// Receiver of selection feedback (UI highlight, speech, text entry)
pub trait SelectionSink {
    fn on_dwell_progress(&mut self, target: &SelectionTarget, progress: f64);
    fn on_select(&mut self, target: &SelectionTarget);
}

/// Sink that records what it receives
#[derive(Debug, Clone, Default)]
pub struct SelectionLog {
    pub selections: Vec<SelectionTarget>,
    pub last_progress: Option<(SelectionTarget, f64)>,
}

impl SelectionSink for SelectionLog {
    fn on_dwell_progress(&mut self, target: &SelectionTarget, progress: f64) {
        self.last_progress = Some((target.clone(), progress));
    }

    fn on_select(&mut self, target: &SelectionTarget) {
        self.selections.push(target.clone());
    }
}

/// Shared sink, so the host can read what the pipeline delivered
impl<S: SelectionSink> SelectionSink for Arc<Mutex<S>> {
    fn on_dwell_progress(&mut self, target: &SelectionTarget, progress: f64) {
        self.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .on_dwell_progress(target, progress);
    }

    fn on_select(&mut self, target: &SelectionTarget) {
        self.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .on_select(target);
    }
}
