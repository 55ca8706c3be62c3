//! Dwell targets

use crate::SelectionError;
use serde::{Deserialize, Serialize};

/// Target geometry in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetShape {
    /// Top-left corner and size; the right and bottom edges are exclusive
    Rect { x: f64, y: f64, width: f64, height: f64 },
    Circle { cx: f64, cy: f64, radius: f64 },
}

impl TargetShape {
    pub fn contains(&self, point: (f64, f64)) -> bool {
        let (px, py) = point;
        match *self {
            TargetShape::Rect { x, y, width, height } => px >= x && px < x + width && py >= y && py < y + height,
            TargetShape::Circle { cx, cy, radius } => (px - cx).hypot(py - cy) <= radius,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        match *self {
            TargetShape::Rect { x, y, width, height } => (x + width / 2.0, y + height / 2.0),
            TargetShape::Circle { cx, cy, .. } => (cx, cy),
        }
    }

    fn check(&self) -> Result<(), String> {
        let (values, positive) = match *self {
            TargetShape::Rect { x, y, width, height } => (vec![x, y, width, height], vec![width, height]),
            TargetShape::Circle { cx, cy, radius } => (vec![cx, cy, radius], vec![radius]),
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err("non-finite geometry".into());
        }
        if positive.iter().any(|v| *v <= 0.0) {
            return Err("size must be positive".into());
        }
        Ok(())
    }
}

/// Selectable on-screen element (letter, phrase, button)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellTarget {
    pub id: String,
    pub shape: TargetShape,
}

impl DwellTarget {
    pub fn rect(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            shape: TargetShape::Rect { x, y, width, height },
        }
    }

    pub fn circle(id: impl Into<String>, cx: f64, cy: f64, radius: f64) -> Self {
        Self {
            id: id.into(),
            shape: TargetShape::Circle { cx, cy, radius },
        }
    }

    pub fn contains(&self, point: (f64, f64)) -> bool {
        self.shape.contains(point)
    }

    pub(crate) fn validate(&self) -> Result<(), SelectionError> {
        self.shape.check().map_err(|reason| SelectionError::InvalidTarget {
            id: self.id.clone(),
            reason,
        })
    }
}
