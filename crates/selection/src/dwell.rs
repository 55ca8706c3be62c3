//! Dwell selection
//!
//! One dwell is tracked at a time. Moving to another target, or off every
//! target, resets progress to zero; no partial credit carries over. Reaching
//! full progress commits once, and the state is released on the next tick.

use crate::config::DwellConfig;
use crate::sink::{SelectionEvent, SelectionTarget};
use crate::target::DwellTarget;
use crate::SelectionError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Phase of the active dwell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DwellPhase {
    /// Entered this tick, no progress yet
    Hovering,
    Selecting,
    /// Committed; released on the next tick
    Committed,
}

/// The single active dwell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellState {
    pub target: SelectionTarget,
    pub dwell_start_ms: u64,
    pub progress: f64,
    pub phase: DwellPhase,
    /// Set once the commit fired; blocks a second commit
    pub locked: bool,
}

impl DwellState {
    fn new(target: SelectionTarget, now_ms: u64) -> Self {
        Self {
            target,
            dwell_start_ms: now_ms,
            progress: 0.0,
            phase: DwellPhase::Hovering,
            locked: false,
        }
    }
}

/// Dwell timing shared by the point and zone selectors
#[derive(Debug, Clone)]
pub(crate) struct DwellTimer {
    dwell_ms: u64,
    cooldown_ms: u64,
    state: Option<DwellState>,
    cooldown_until: Option<u64>,
    commits: u64,
}

impl DwellTimer {
    pub(crate) fn new(dwell_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            dwell_ms,
            cooldown_ms,
            state: None,
            cooldown_until: None,
            commits: 0,
        }
    }

    pub(crate) fn state(&self) -> Option<&DwellState> {
        self.state.as_ref()
    }

    pub(crate) fn commits(&self) -> u64 {
        self.commits
    }

    /// Advance with whatever is under the gaze this tick
    pub(crate) fn step(
        &mut self,
        current: Option<SelectionTarget>,
        ambiguous: bool,
        now_ms: u64,
        events: &mut Vec<SelectionEvent>,
    ) {
        if self.state.as_ref().is_some_and(|s| s.locked) {
            self.state = None;
        }
        if let Some(until) = self.cooldown_until {
            if now_ms < until {
                return;
            }
            self.cooldown_until = None;
        }

        match (&mut self.state, current) {
            (Some(state), Some(target)) if state.target == target => {
                let elapsed = now_ms.saturating_sub(state.dwell_start_ms);
                let progress = (elapsed as f64 / self.dwell_ms as f64).min(1.0);
                state.progress = state.progress.max(progress);
                state.phase = DwellPhase::Selecting;
                events.push(SelectionEvent::DwellProgress {
                    target: target.clone(),
                    progress: state.progress,
                    ambiguous,
                });

                if state.progress >= 1.0 && !state.locked {
                    state.locked = true;
                    state.phase = DwellPhase::Committed;
                    self.commits += 1;
                    if self.cooldown_ms > 0 {
                        self.cooldown_until = Some(now_ms + self.cooldown_ms);
                    }
                    info!("Selection committed: {:?} after {}ms", target, elapsed);
                    events.push(SelectionEvent::Selected {
                        target,
                        timestamp_ms: now_ms,
                    });
                }
            }
            (slot, current) => {
                if let Some(previous) = slot.take() {
                    debug!("Dwell on {:?} reset at {:.2}", previous.target, previous.progress);
                    events.push(SelectionEvent::DwellProgress {
                        target: previous.target,
                        progress: 0.0,
                        ambiguous: false,
                    });
                }
                if let Some(target) = current {
                    events.push(SelectionEvent::DwellProgress {
                        target: target.clone(),
                        progress: 0.0,
                        ambiguous,
                    });
                    *slot = Some(DwellState::new(target, now_ms));
                }
            }
        }
    }

    /// Drop the active dwell and any cooldown
    pub(crate) fn clear(&mut self) {
        self.state = None;
        self.cooldown_until = None;
    }
}

/// Continuous-mode selector over a set of screen targets
#[derive(Debug, Clone)]
pub struct DwellSelector {
    config: DwellConfig,
    targets: Vec<DwellTarget>,
    timer: DwellTimer,
}

impl DwellSelector {
    pub fn new(config: DwellConfig) -> Result<Self, SelectionError> {
        config.validate()?;
        info!("Creating dwell selector with config: {:?}", config);
        let timer = DwellTimer::new(config.dwell_ms, config.cooldown_ms);
        Ok(Self {
            config,
            targets: Vec::new(),
            timer,
        })
    }

    pub fn config(&self) -> &DwellConfig {
        &self.config
    }

    /// Replace the candidate targets. A dwell on a target that disappeared is reset.
    pub fn set_targets(&mut self, targets: Vec<DwellTarget>) -> Result<(), SelectionError> {
        for target in &targets {
            target.validate()?;
        }
        if let Some(SelectionTarget::Target(id)) = self.timer.state().map(|s| &s.target) {
            if !targets.iter().any(|t| &t.id == id) {
                debug!("Dwell target {} removed, resetting", id);
                self.timer.clear();
            }
        }
        self.targets = targets;
        Ok(())
    }

    pub fn targets(&self) -> &[DwellTarget] {
        &self.targets
    }

    /// Target under `point`, last match wins. Also reports whether targets overlapped.
    pub fn hit_test(&self, point: (f64, f64)) -> Option<(&DwellTarget, bool)> {
        let mut hits = self.targets.iter().filter(|t| t.contains(point));
        let first = hits.next()?;
        let (last, extra) = hits.fold((first, 0usize), |(_, n), t| (t, n + 1));
        Some((last, extra > 0))
    }

    /// Feed one stabilized gaze point in screen pixels
    pub fn update(&mut self, point: Option<(f64, f64)>, confidence: f64, now_ms: u64) -> Vec<SelectionEvent> {
        let point = point.filter(|p| p.0.is_finite() && p.1.is_finite() && confidence >= self.config.min_confidence);
        let hit = point.and_then(|p| self.hit_test(p));
        let (current, ambiguous) = match hit {
            Some((target, ambiguous)) => {
                if ambiguous {
                    debug!("Gaze over overlapping targets, selecting {}", target.id);
                }
                (Some(SelectionTarget::Target(target.id.clone())), ambiguous)
            }
            None => (None, false),
        };

        let mut events = Vec::new();
        self.timer.step(current, ambiguous, now_ms, &mut events);
        events
    }

    pub fn state(&self) -> Option<&DwellState> {
        self.timer.state()
    }

    /// Progress of the active dwell, 0 when idle
    pub fn progress(&self) -> f64 {
        self.timer.state().map_or(0.0, |s| s.progress)
    }

    /// Selections committed since creation
    pub fn commit_count(&self) -> u64 {
        self.timer.commits()
    }

    /// Abort the active dwell immediately
    pub fn cancel(&mut self) {
        self.timer.clear();
    }
}

impl Default for DwellSelector {
    fn default() -> Self {
        Self {
            config: DwellConfig::default(),
            targets: Vec::new(),
            timer: DwellTimer::new(DwellConfig::default().dwell_ms, 0),
        }
    }
}
