use std::path::Path;

use thiserror::Error;

use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::video_properties::VideoProperties;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
///
/// Frames are written in the order received. A frame whose geometry differs
/// from the properties passed to `open` is rejected with [`GeometryMismatch`].
pub trait VideoWriter: Send {
    /// Prepares `path` for frames of the given geometry. A failed open must
    /// not leave a truncated file behind at `path`.
    fn open(
        &mut self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error(
    "frame {index} is {width}x{height}x{channels}, sink expects {expected_width}x{expected_height}x3"
)]
pub struct GeometryMismatch {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub expected_width: u32,
    pub expected_height: u32,
}

/// Checks a frame against the geometry a sink was opened with.
pub fn check_geometry(
    properties: &VideoProperties,
    frame: &Frame,
) -> Result<(), GeometryMismatch> {
    if frame.width() == properties.width
        && frame.height() == properties.height
        && frame.channels() == CHANNELS
    {
        return Ok(());
    }
    Err(GeometryMismatch {
        index: frame.index(),
        width: frame.width(),
        height: frame.height(),
        channels: frame.channels(),
        expected_width: properties.width,
        expected_height: properties.height,
    })
}
