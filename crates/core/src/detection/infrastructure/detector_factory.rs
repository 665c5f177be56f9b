use std::path::Path;

use crate::detection::domain::detector_backend::DetectorBackend;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_localizer::FaceLocalizer;

use super::model_resolver::{self, ModelSource};
use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Resolves the backend's model and wraps the loaded detector in a
/// [`FaceLocalizer`]. Runs once per pipeline, before the first frame.
pub fn create_face_localizer(
    backend: DetectorBackend,
    confidence: f64,
    model_dir: Option<&Path>,
) -> Result<FaceLocalizer, Box<dyn std::error::Error>> {
    let model_path = model_resolver::resolve(&ModelSource::for_backend(backend), model_dir)?;
    log::info!(
        "Loading {backend} detector from {} (confidence {confidence})",
        model_path.display()
    );

    let detector: Box<dyn FaceDetector> = match backend {
        DetectorBackend::Geometric => Box::new(OnnxBlazefaceDetector::new(&model_path, confidence)?),
        DetectorBackend::DeepModel => Box::new(OnnxYoloDetector::new(&model_path, confidence)?),
    };
    Ok(FaceLocalizer::new(detector, backend))
}
