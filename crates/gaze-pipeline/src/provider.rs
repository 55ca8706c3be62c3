//! External face detector seam

use frame_input::{FaceRegion, Frame};

/// Supplies a face box from an external detector.
///
/// Returning `None` falls back to the frame's own box, then to the
/// skin-tone estimator.
pub trait FaceBoxProvider {
    /// Box in full-resolution frame coordinates
    fn face_box(&mut self, frame: &Frame) -> Option<FaceRegion>;
}

impl<F> FaceBoxProvider for F
where
    F: FnMut(&Frame) -> Option<FaceRegion>,
{
    fn face_box(&mut self, frame: &Frame) -> Option<FaceRegion> {
        self(frame)
    }
}
