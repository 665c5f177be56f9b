use ndarray::ArrayView3;

use super::bounding_box::BoundingBox;

/// Number of color channels every frame carries.
pub const CHANNELS: u8 = 3;

/// A single decoded video frame: packed RGB24 bytes in row-major order.
///
/// The byte order is fixed when the source is opened and never changes
/// during a run. Redaction mutates the buffer in place through `&mut`.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `bbox` into a standalone RGB image.
    ///
    /// The box is clamped to the frame first; `None` when nothing is left.
    pub fn crop_image(&self, bbox: &BoundingBox) -> Option<image::RgbImage> {
        if self.channels != CHANNELS {
            return None;
        }
        let clamped = bbox.clamp(self.width, self.height)?;
        let view = image::ImageBuffer::<image::Rgb<u8>, &[u8]>::from_raw(
            self.width,
            self.height,
            &self.data[..],
        )?;
        Some(
            image::imageops::crop_imm(
                &view,
                clamped.x1 as u32,
                clamped.y1 as u32,
                clamped.width() as u32,
                clamped.height() as u32,
            )
            .to_image(),
        )
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
