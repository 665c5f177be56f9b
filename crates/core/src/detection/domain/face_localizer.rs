use crate::shared::frame::Frame;

use super::detection_result::DetectionResult;
use super::detector_backend::DetectorBackend;
use super::face_detector::FaceDetector;

/// Per-frame face localization that never fails.
///
/// Wraps one [`FaceDetector`] backend. Any backend error is logged and turned
/// into an empty result, so a bad frame is written unredacted instead of
/// aborting the run. Absent faces and failed detections look the same to the
/// caller; only [`FaceLocalizer::failures`] tells them apart.
pub struct FaceLocalizer {
    detector: Box<dyn FaceDetector>,
    backend: DetectorBackend,
    failures: usize,
}

impl FaceLocalizer {
    pub fn new(detector: Box<dyn FaceDetector>, backend: DetectorBackend) -> Self {
        Self {
            detector,
            backend,
            failures: 0,
        }
    }

    pub fn localize(&mut self, frame: &Frame) -> DetectionResult {
        match self.detector.detect(frame) {
            Ok(boxes) => DetectionResult::new(boxes),
            Err(e) => {
                self.failures += 1;
                log::debug!(
                    "{} detector failed on frame {}: {e}",
                    self.backend,
                    frame.index()
                );
                DetectionResult::empty()
            }
        }
    }

    pub fn backend(&self) -> DetectorBackend {
        self.backend
    }

    /// Number of frames whose detection error was absorbed.
    pub fn failures(&self) -> usize {
        self.failures
    }
}
