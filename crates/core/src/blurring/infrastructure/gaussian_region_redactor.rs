use std::cell::RefCell;

use crate::blurring::domain::blur_settings::BlurSettings;
use crate::blurring::domain::region_redactor::RegionRedactor;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::gaussian::{self, PreparedKernel, RoiRect};

/// Redacts a rectangle by replacing it with a Gaussian-blurred copy of itself.
///
/// The blur only samples pixels inside the (clamped) rectangle. Pixels
/// outside it are never read or written. Scratch buffers are reused across
/// calls.
pub struct GaussianRegionRedactor {
    settings: BlurSettings,
    kernel: PreparedKernel,
    roi_buf: RefCell<Vec<u8>>,
    blur_temp: RefCell<Vec<f32>>,
}

impl GaussianRegionRedactor {
    pub fn new(settings: BlurSettings) -> Self {
        Self {
            kernel: PreparedKernel::new(&settings),
            settings,
            roi_buf: RefCell::new(Vec::new()),
            blur_temp: RefCell::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &BlurSettings {
        &self.settings
    }
}

impl RegionRedactor for GaussianRegionRedactor {
    fn redact(&self, frame: &mut Frame, bbox: &BoundingBox) {
        let Some(clamped) = bbox.clamp(frame.width(), frame.height()) else {
            return;
        };
        let rect = RoiRect::from_clamped(&clamped);
        let fw = frame.width() as usize;
        let channels = frame.channels() as usize;
        let data = frame.data_mut();

        let mut roi = self.roi_buf.borrow_mut();
        let mut temp = self.blur_temp.borrow_mut();

        gaussian::extract_roi(data, fw, channels, rect, &mut roi);
        gaussian::blur_roi_in_place(&mut roi, rect.w, rect.h, channels, &self.kernel, &mut temp);
        gaussian::write_roi_back(data, &roi, fw, channels, rect);
    }
}
