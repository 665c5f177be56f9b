use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for obscuring one region of a frame.
///
/// Implementations modify the frame in place (`&mut Frame`). The box is
/// clamped to the frame first; a box with no area left is skipped. Redaction
/// never fails and never touches pixels outside the clamped box.
pub trait RegionRedactor: Send {
    fn redact(&self, frame: &mut Frame, bbox: &BoundingBox);
}
