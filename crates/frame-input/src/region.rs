//! Face regions, pixel rectangles and head pose

use serde::{Deserialize, Serialize};

/// Face bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence (0-1)
    pub confidence: f64,
}

impl FaceRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Center of the box
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Clamp the box to frame bounds.
    ///
    /// Returns `None` when nothing of the box remains inside the frame or the
    /// coordinates are not finite.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Self> {
        if ![self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite()) {
            return None;
        }
        let x0 = self.x.max(0.0);
        let y0 = self.y.max(0.0);
        let x1 = (self.x + self.width).min(f64::from(frame_width));
        let y1 = (self.y + self.height).min(f64::from(frame_height));
        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            confidence: self.confidence,
        })
    }

    /// Scale all coordinates by `factor` (used when the working image is resized)
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
        }
    }

    /// Sub-rectangle described by fractions of the box size
    pub fn fraction_rect(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> PixelRect {
        let left = (self.x + self.width * x0).floor().max(0.0);
        let top = (self.y + self.height * y0).floor().max(0.0);
        let right = (self.x + self.width * x1).ceil().max(left);
        let bottom = (self.y + self.height * y1).ceil().max(top);
        PixelRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Intersection with a `width`x`height` image
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.right().min(width) - x,
            height: self.bottom().min(height) - y,
        }
    }

    /// Keep only the lower `fraction` of the rectangle
    pub fn lower_fraction(&self, fraction: f64) -> Self {
        let keep = (f64::from(self.height) * fraction.clamp(0.0, 1.0)).round() as u32;
        Self {
            x: self.x,
            y: self.bottom() - keep,
            width: self.width,
            height: keep,
        }
    }

    /// Scale by `factor` back into another coordinate space
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: (f64::from(self.x) * factor).round() as u32,
            y: (f64::from(self.y) * factor).round() as u32,
            width: (f64::from(self.width) * factor).round() as u32,
            height: (f64::from(self.height) * factor).round() as u32,
        }
    }
}

/// Head pose (Euler angles)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Yaw (left-right rotation) in degrees
    pub yaw: f64,
    /// Pitch (up-down tilt) in degrees
    pub pitch: f64,
    /// Roll (side tilt) in degrees
    pub roll: f64,
}

impl HeadPose {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_frame() {
        let face = FaceRegion::new(-20.0, 10.0, 100.0, 600.0, 0.9);
        let clamped = face.clamp_to(640, 480).unwrap();
        assert_eq!(clamped.x, 0.0);
        assert_eq!(clamped.width, 80.0);
        assert_eq!(clamped.height, 470.0);
    }

    #[test]
    fn test_clamp_outside_frame() {
        let face = FaceRegion::new(700.0, 10.0, 100.0, 100.0, 0.9);
        assert!(face.clamp_to(640, 480).is_none());
        let nan = FaceRegion::new(f64::NAN, 0.0, 10.0, 10.0, 0.5);
        assert!(nan.clamp_to(640, 480).is_none());
    }

    #[test]
    fn test_fraction_rect() {
        let face = FaceRegion::new(100.0, 100.0, 200.0, 200.0, 1.0);
        let rect = face.fraction_rect(0.15, 0.40, 0.25, 0.45);
        assert_eq!(rect, PixelRect::new(130, 150, 50, 40));
    }

    #[test]
    fn test_lower_fraction() {
        let rect = PixelRect::new(10, 20, 40, 100);
        let lower = rect.lower_fraction(0.7);
        assert_eq!(lower.y, 50);
        assert_eq!(lower.bottom(), rect.bottom());
        assert_eq!(lower.height, 70);
    }

    #[test]
    fn test_pixel_rect_clamp() {
        let rect = PixelRect::new(600, 460, 100, 100).clamp_to(640, 480);
        assert_eq!(rect, PixelRect::new(600, 460, 40, 20));
    }
}
