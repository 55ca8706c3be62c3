//! Calibration target sequences

use serde::{Deserialize, Serialize};

/// Number of calibration targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationMode {
    /// Center and four corners
    Quick5,
    #[default]
    Standard9,
    /// Standard grid plus four inner points
    Extended13,
}

/// Target in normalized screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl CalibrationPoint {
    /// Target position in screen pixels
    pub fn to_screen(&self, viewport: (f64, f64)) -> (f64, f64) {
        (self.x * viewport.0, self.y * viewport.1)
    }
}

const LOW: f64 = 0.1;
const HIGH: f64 = 0.9;

/// Ordered targets: center first, then corners, edges and inner points
pub fn calibration_points(mode: CalibrationMode) -> Vec<CalibrationPoint> {
    let mut coords = vec![(0.5, 0.5), (LOW, LOW), (HIGH, LOW), (LOW, HIGH), (HIGH, HIGH)];
    if matches!(mode, CalibrationMode::Standard9 | CalibrationMode::Extended13) {
        coords.extend([(0.5, LOW), (HIGH, 0.5), (0.5, HIGH), (LOW, 0.5)]);
    }
    if mode == CalibrationMode::Extended13 {
        coords.extend([(0.3, 0.3), (0.7, 0.3), (0.3, 0.7), (0.7, 0.7)]);
    }
    numbered(coords)
}

/// Fresh 3x3 grid used by the accuracy test, offset from the calibration targets
pub fn validation_points() -> Vec<CalibrationPoint> {
    let mut coords = Vec::with_capacity(9);
    for &y in &[0.15, 0.5, 0.85] {
        for &x in &[0.15, 0.5, 0.85] {
            coords.push((x, y));
        }
    }
    numbered(coords)
}

fn numbered(coords: Vec<(f64, f64)>) -> Vec<CalibrationPoint> {
    coords
        .into_iter()
        .enumerate()
        .map(|(id, (x, y))| CalibrationPoint { id, x, y })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_counts() {
        assert_eq!(calibration_points(CalibrationMode::Quick5).len(), 5);
        assert_eq!(calibration_points(CalibrationMode::Standard9).len(), 9);
        assert_eq!(calibration_points(CalibrationMode::Extended13).len(), 13);
        assert_eq!(validation_points().len(), 9);
    }

    #[test]
    fn test_center_first_then_corners() {
        let points = calibration_points(CalibrationMode::Standard9);
        assert_eq!((points[0].x, points[0].y), (0.5, 0.5));
        for p in &points[1..5] {
            assert!(p.x != 0.5 && p.y != 0.5);
        }
        assert!(points.iter().enumerate().all(|(i, p)| p.id == i));
    }

    #[test]
    fn test_targets_normalized() {
        for p in calibration_points(CalibrationMode::Extended13).iter().chain(&validation_points()) {
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
        }
        let p = CalibrationPoint { id: 0, x: 0.5, y: 0.25 };
        assert_eq!(p.to_screen((1920.0, 1080.0)), (960.0, 270.0));
    }
}
