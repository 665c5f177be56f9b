use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Backend interface for face detection.
///
/// Returned boxes are in frame pixel coordinates and may extend past the
/// frame; callers clamp. `&mut self` because ONNX sessions run mutably.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
