pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// BlazeFace short-range model. Has no download source; it must be placed in
/// the model cache or a bundled model directory.
pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Four-character code of the output codec.
pub const OUTPUT_FOURCC: &str = "WMV2";
pub const OUTPUT_EXTENSION: &str = "wmv";

/// Name and media type used when the redacted video is handed back as bytes.
pub const OUTPUT_FILE_NAME: &str = "blurred_faces_output.wmv";
pub const OUTPUT_MIME_TYPE: &str = "video/wmv";

/// Suffix appended to the input stem when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_blurred";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];
