//! Head-pose zone selection
//!
//! The screen is a fixed 3x3 grid. Yaw picks the column and pitch the row;
//! a zone is committed with the same dwell rules as point selection.

use crate::config::ZoneConfig;
use crate::dwell::{DwellState, DwellTimer};
use crate::sink::{SelectionEvent, SelectionTarget};
use crate::SelectionError;
use frame_input::HeadPose;
use serde::Serialize;
use tracing::{debug, info};

/// Cells in the grid
pub const ZONE_COUNT: usize = 9;

const NAMES: [&str; ZONE_COUNT] = [
    "top-left",
    "top",
    "top-right",
    "left",
    "center",
    "right",
    "bottom-left",
    "bottom",
    "bottom-right",
];

/// Zone bounds in percent of the screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One grid cell, `id = row * 3 + col`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub id: usize,
    pub row: usize,
    pub col: usize,
    pub name: &'static str,
    pub bounds: ZoneBounds,
    pub hovered: bool,
    pub dwell_start_ms: Option<u64>,
}

fn grid() -> [Zone; ZONE_COUNT] {
    let cell = 100.0 / 3.0;
    std::array::from_fn(|id| {
        let (row, col) = (id / 3, id % 3);
        Zone {
            id,
            row,
            col,
            name: NAMES[id],
            bounds: ZoneBounds {
                left: col as f64 * cell,
                top: row as f64 * cell,
                width: cell,
                height: cell,
            },
            hovered: false,
            dwell_start_ms: None,
        }
    })
}

/// Band of one axis: 0 negative, 1 neutral, 2 positive. Thresholds are strict.
fn band(value: f64, threshold: f64) -> usize {
    if value > threshold {
        2
    } else if value < -threshold {
        0
    } else {
        1
    }
}

/// Band with a hysteresis margin around the current band
fn band_with_hysteresis(value: f64, threshold: f64, hysteresis: f64, current: Option<usize>) -> usize {
    let raw = band(value, threshold);
    match current {
        Some(cur) if hysteresis > 0.0 && raw != cur => {
            let held = match cur {
                1 => value.abs() <= threshold + hysteresis,
                2 => value > threshold - hysteresis,
                _ => value < -(threshold - hysteresis),
            };
            if held {
                cur
            } else {
                raw
            }
        }
        _ => raw,
    }
}

/// Discrete selector driven by head pose
#[derive(Debug, Clone)]
pub struct ZoneSelector {
    config: ZoneConfig,
    zones: [Zone; ZONE_COUNT],
    current: Option<usize>,
    timer: DwellTimer,
}

impl ZoneSelector {
    pub fn new(config: ZoneConfig) -> Result<Self, SelectionError> {
        config.validate()?;
        info!("Creating zone selector with config: {:?}", config);
        let timer = DwellTimer::new(config.dwell_ms, config.cooldown_ms);
        Ok(Self {
            config,
            zones: grid(),
            current: None,
            timer,
        })
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Replace the configuration; any active dwell is dropped
    pub fn set_zone_config(&mut self, config: ZoneConfig) -> Result<(), SelectionError> {
        config.validate()?;
        self.timer = DwellTimer::new(config.dwell_ms, config.cooldown_ms);
        self.config = config;
        self.clear_zones();
        Ok(())
    }

    /// Zone for a pose, ignoring hysteresis
    pub fn classify(&self, yaw: f64, pitch: f64) -> usize {
        let (yaw, pitch) = self.oriented(yaw, pitch);
        let col = band(yaw, self.config.yaw_threshold_deg);
        let row = 2 - band(pitch, self.config.pitch_threshold_deg);
        row * 3 + col
    }

    fn oriented(&self, yaw: f64, pitch: f64) -> (f64, f64) {
        let yaw = if self.config.invert_yaw { -yaw } else { yaw };
        let pitch = if self.config.invert_pitch { -pitch } else { pitch };
        (yaw, pitch)
    }

    fn classify_held(&self, yaw: f64, pitch: f64) -> usize {
        let (yaw, pitch) = self.oriented(yaw, pitch);
        let h = self.config.hysteresis_deg;
        let col = band_with_hysteresis(yaw, self.config.yaw_threshold_deg, h, self.current.map(|z| z % 3));
        // Pitch up selects the top row
        let row_band = band_with_hysteresis(
            pitch,
            self.config.pitch_threshold_deg,
            h,
            self.current.map(|z| 2 - z / 3),
        );
        (2 - row_band) * 3 + col
    }

    /// Feed one head pose; `None` when no pose is available this frame
    pub fn update(&mut self, pose: Option<&HeadPose>, now_ms: u64) -> Vec<SelectionEvent> {
        let zone = pose
            .filter(|p| p.yaw.is_finite() && p.pitch.is_finite())
            .map(|p| self.classify_held(p.yaw, p.pitch));
        if zone != self.current {
            debug!("Zone changed: {:?} -> {:?}", self.current, zone);
        }
        self.current = zone;

        let mut events = Vec::new();
        self.timer.step(zone.map(SelectionTarget::Zone), false, now_ms, &mut events);

        let active = self.timer.state().and_then(|s| match s.target {
            SelectionTarget::Zone(id) => Some((id, s.dwell_start_ms)),
            SelectionTarget::Target(_) => None,
        });
        for z in &mut self.zones {
            z.hovered = zone == Some(z.id);
            z.dwell_start_ms = active.filter(|(id, _)| *id == z.id).map(|(_, start)| start);
        }
        events
    }

    pub fn zones(&self) -> &[Zone; ZONE_COUNT] {
        &self.zones
    }

    pub fn current_zone(&self) -> Option<usize> {
        self.current
    }

    pub fn state(&self) -> Option<&DwellState> {
        self.timer.state()
    }

    pub fn progress(&self) -> f64 {
        self.timer.state().map_or(0.0, |s| s.progress)
    }

    pub fn commit_count(&self) -> u64 {
        self.timer.commits()
    }

    /// Abort the active dwell and forget the current zone
    pub fn cancel(&mut self) {
        self.timer.clear();
        self.clear_zones();
    }

    fn clear_zones(&mut self) {
        self.current = None;
        for z in &mut self.zones {
            z.hovered = false;
            z.dwell_start_ms = None;
        }
    }
}
