//! Synthetic face scenes
//!
//! Renders a flat-shaded face with two eyes whose pupils follow a gaze
//! direction. Geometry matches the default face/eye ratios used by the
//! detectors, so a rendered scene is a known-answer fixture.

use crate::frame::Frame;
use crate::region::FaceRegion;
use image::{Rgba, RgbaImage};

/// Face box width as a fraction of frame width
pub const FACE_WIDTH_RATIO: f64 = 0.4;
/// Face box height as a fraction of frame height
pub const FACE_HEIGHT_RATIO: f64 = 0.55;
/// Eye centers as fractions of the face box
pub const LEFT_EYE: (f64, f64) = (0.275, 0.35);
pub const RIGHT_EYE: (f64, f64) = (0.725, 0.35);
/// Sclera half-axes as fractions of the face box
const SCLERA_HALF_WIDTH: f64 = 0.09;
const SCLERA_HALF_HEIGHT: f64 = 0.045;

/// Synthetic scene description
#[derive(Debug, Clone)]
pub struct FaceScene {
    pub width: u32,
    pub height: u32,
    /// Face center (normalized 0-1 of the frame)
    pub face_center: (f64, f64),
    /// Gaze direction in [-1, 1] per axis; moves pupils inside the sclera
    pub gaze: (f64, f64),
    /// Pupil radius in pixels
    pub pupil_radius: f64,
    /// Blank the upper part of each eye (eyelid occlusion), fraction of sclera height
    pub eyelid_cover: f64,
    pub skin: [u8; 3],
    pub background: [u8; 3],
    pub sclera: [u8; 3],
    pub pupil: [u8; 3],
}

impl Default for FaceScene {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            face_center: (0.5, 0.5),
            gaze: (0.0, 0.0),
            pupil_radius: 6.0,
            eyelid_cover: 0.0,
            skin: [200, 150, 120],
            background: [40, 60, 90],
            sclera: [240, 240, 240],
            pupil: [20, 20, 20],
        }
    }
}

impl FaceScene {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_gaze(mut self, gx: f64, gy: f64) -> Self {
        self.gaze = (gx.clamp(-1.0, 1.0), gy.clamp(-1.0, 1.0));
        self
    }

    pub fn with_face_center(mut self, cx: f64, cy: f64) -> Self {
        self.face_center = (cx, cy);
        self
    }

    /// Face box of the rendered face
    pub fn face_region(&self) -> FaceRegion {
        let fw = f64::from(self.width) * FACE_WIDTH_RATIO;
        let fh = f64::from(self.height) * FACE_HEIGHT_RATIO;
        let cx = f64::from(self.width) * self.face_center.0;
        let cy = f64::from(self.height) * self.face_center.1;
        FaceRegion::new(cx - fw / 2.0, cy - fh / 2.0, fw, fh, 1.0)
    }

    /// Pupil centers (left, right) in frame pixels
    pub fn pupil_centers(&self) -> [(f64, f64); 2] {
        let face = self.face_region();
        let (max_dx, max_dy) = self.pupil_travel(&face);
        [LEFT_EYE, RIGHT_EYE].map(|(ex, ey)| {
            (
                face.x + face.width * ex + self.gaze.0 * max_dx,
                face.y + face.height * ey + self.gaze.1 * max_dy,
            )
        })
    }

    fn pupil_travel(&self, face: &FaceRegion) -> (f64, f64) {
        let dx = (face.width * SCLERA_HALF_WIDTH - self.pupil_radius).max(0.0);
        let dy = (face.height * SCLERA_HALF_HEIGHT - self.pupil_radius).max(0.0);
        (dx, dy)
    }

    /// Render the scene into an RGBA frame
    pub fn render(&self, timestamp_ms: u64) -> Frame {
        let face = self.face_region();
        let (fcx, fcy) = face.center();
        let (frx, fry) = (face.width / 2.0, face.height / 2.0);
        let sclera_rx = face.width * SCLERA_HALF_WIDTH;
        let sclera_ry = face.height * SCLERA_HALF_HEIGHT;
        let eye_centers = [LEFT_EYE, RIGHT_EYE]
            .map(|(ex, ey)| (face.x + face.width * ex, face.y + face.height * ey));
        let pupils = self.pupil_centers();
        let r2 = self.pupil_radius * self.pupil_radius;

        let mut image = RgbaImage::from_pixel(self.width, self.height, rgba(self.background));
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            if !inside_ellipse(px, py, fcx, fcy, frx, fry) {
                continue;
            }
            let mut color = self.skin;
            for (eye, pupil) in eye_centers.iter().zip(pupils.iter()) {
                if inside_ellipse(px, py, eye.0, eye.1, sclera_rx, sclera_ry) {
                    let lid_line = eye.1 - sclera_ry + 2.0 * sclera_ry * self.eyelid_cover;
                    if py < lid_line {
                        color = self.skin;
                    } else if (px - pupil.0).powi(2) + (py - pupil.1).powi(2) <= r2 {
                        color = self.pupil;
                    } else {
                        color = self.sclera;
                    }
                }
            }
            *pixel = rgba(color);
        }

        // Zero-sized scenes degrade to a 1x1 frame
        Frame::from_image(image, timestamp_ms).unwrap_or_else(|_| blank(1, 1, self.background, timestamp_ms))
    }
}

/// Uniform frame of a single color
pub fn blank(width: u32, height: u32, color: [u8; 3], timestamp_ms: u64) -> Frame {
    let image = RgbaImage::from_pixel(width.max(1), height.max(1), rgba(color));
    Frame {
        image,
        timestamp_ms,
        face_box: None,
        head_pose: None,
    }
}

fn rgba(c: [u8; 3]) -> Rgba<u8> {
    Rgba([c[0], c[1], c[2], 255])
}

fn inside_ellipse(px: f64, py: f64, cx: f64, cy: f64, rx: f64, ry: f64) -> bool {
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let dx = (px - cx) / rx;
    let dy = (py - cy) / ry;
    dx * dx + dy * dy <= 1.0
}
