//! Deep-model backend: YOLO face detector on ONNX Runtime.
//!
//! Letterboxes the frame to the model's square input, decodes candidates
//! back into frame pixel coordinates and filters them with NMS. Boxes are
//! not clamped to the frame.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::create_session;
use super::math::nms;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Gray used for letterbox padding (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// A face found by the deep model: its pixel box plus the pixels under it.
#[derive(Clone, Debug)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub confidence: f64,
    /// `None` when the box lies entirely outside the frame.
    pub crop: Option<image::RgbImage>,
}

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 if the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = create_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("YOLO input size {input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    /// Runs the model on one frame and returns each face with its crop.
    pub fn detect_faces(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let lb = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(lb.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = parse_output(data, tensor.shape(), self.confidence, &lb.mapping)?;
        let corners: Vec<[f64; 4]> = candidates.iter().map(|c| c.corners).collect();
        let scores: Vec<f64> = candidates.iter().map(|c| c.confidence).collect();

        Ok(nms(&corners, &scores, NMS_IOU_THRESH)
            .into_iter()
            .map(|i| {
                let bbox = BoundingBox::from_pixel_corners(candidates[i].corners);
                DetectedFace {
                    bbox,
                    confidence: candidates[i].confidence,
                    crop: frame.crop_image(&bbox),
                }
            })
            .collect())
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        Ok(self
            .detect_faces(frame)?
            .into_iter()
            .map(|face| face.bbox)
            .collect())
    }
}

/// Maps letterboxed model coordinates back to frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxMapping {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxMapping {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    mapping: LetterboxMapping,
}

/// Letterbox-resize a frame to `target_size` × `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> Letterboxed {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        mapping: LetterboxMapping {
            scale,
            pad_x,
            pad_y,
        },
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    corners: [f64; 4],
    confidence: f64,
}

/// Reads `[cx, cy, w, h, conf, ...]` rows from a `[1, F, N]` or `[1, N, F]`
/// output and keeps those at or above `confidence`.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    mapping: &LetterboxMapping,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    // Fewer features than detections means the layout is [1, F, N]
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Ok(Vec::new());
    }
    if data.len() < num_dets * num_feats {
        return Err(format!(
            "YOLO output has {} values, shape {shape:?} needs {}",
            data.len(),
            num_dets * num_feats
        )
        .into());
    }

    let feature = |det: usize, f: usize| -> f64 {
        if transposed {
            data[f * num_dets + det] as f64
        } else {
            data[det * num_feats + f] as f64
        }
    };

    let mut candidates = Vec::new();
    for i in 0..num_dets {
        let conf = feature(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
        let (x1, y1) = mapping.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = mapping.to_frame(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            corners: [x1, y1, x2, y2],
            confidence: conf,
        });
    }
    Ok(candidates)
}
