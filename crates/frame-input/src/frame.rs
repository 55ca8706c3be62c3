//! Video frame types and processing

use crate::region::{FaceRegion, HeadPose};
use crate::FrameError;
use image::{imageops, GrayImage, RgbaImage};
use tracing::trace;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// RGBA frame supplied once per tick by the frame source
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) image: RgbaImage,
    /// Capture timestamp (milliseconds, monotonic)
    pub timestamp_ms: u64,
    /// Face box from an external detector, if any
    pub face_box: Option<FaceRegion>,
    /// Head pose from an external tracker, if any
    pub head_pose: Option<HeadPose>,
}

impl Frame {
    /// Create a frame from a raw RGBA buffer (width * height * 4 bytes)
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ms: u64) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or(FrameError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(FrameError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let actual = data.len();
        let image = RgbaImage::from_raw(width, height, data)
            .ok_or(FrameError::BufferSizeMismatch { expected, actual })?;

        Ok(Self {
            image,
            timestamp_ms,
            face_box: None,
            head_pose: None,
        })
    }

    /// Wrap an already decoded image
    pub fn from_image(image: RgbaImage, timestamp_ms: u64) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        Ok(Self {
            image,
            timestamp_ms,
            face_box: None,
            head_pose: None,
        })
    }

    /// Attach a face box from an external detector
    pub fn with_face_box(mut self, face: FaceRegion) -> Self {
        self.face_box = Some(face);
        self
    }

    /// Attach a head pose from an external tracker
    pub fn with_head_pose(mut self, pose: HeadPose) -> Self {
        self.head_pose = Some(pose);
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Convert to grayscale
    pub fn to_luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Shrink the frame by an integer factor for cheaper processing.
    ///
    /// External face boxes are rescaled with the image; head pose is unaffected.
    pub fn downscale(&self, factor: u32) -> Frame {
        if factor <= 1 {
            return self.clone();
        }
        let new_width = (self.width() / factor).max(1);
        let new_height = (self.height() / factor).max(1);
        trace!(
            "Downscaling frame {}x{} -> {}x{}",
            self.width(),
            self.height(),
            new_width,
            new_height
        );
        let image = imageops::resize(&self.image, new_width, new_height, imageops::FilterType::Triangle);
        let scale = f64::from(new_width) / f64::from(self.width());

        Frame {
            image,
            timestamp_ms: self.timestamp_ms,
            face_box: self.face_box.map(|f| f.scaled(scale)),
            head_pose: self.head_pose,
        }
    }
}
