use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_properties::VideoProperties;

/// Reads frames from a video container.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoProperties`
/// types. Every frame is packed RGB24.
pub trait VideoReader: Send {
    /// Opens a video file and returns its properties.
    ///
    /// Fails if the container cannot be read or reports a zero dimension.
    fn open(&mut self, path: &Path) -> Result<VideoProperties, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order; `None` is end-of-stream.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
