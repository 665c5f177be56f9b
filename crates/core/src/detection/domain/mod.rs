pub mod detection_result;
pub mod detector_backend;
pub mod face_detector;
pub mod face_localizer;
