//! Geometric backend: BlazeFace short-range face detector on ONNX Runtime.
//!
//! The model reports boxes relative to its 128×128 input. They are decoded
//! into normalized `(xmin, ymin, width, height)` boxes and mapped onto the
//! frame with [`BoundingBox::from_normalized`].
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::create_session;
use super::math::nms;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output (box + 6 keypoints).
const REGRESSOR_STRIDE: usize = 16;

/// Face box relative to the frame, each term in `[0, 1]` for on-frame faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    fn corners(&self) -> [f64; 4] {
        [
            self.xmin,
            self.ymin,
            self.xmin + self.width,
            self.ymin + self.height,
        ]
    }
}

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: create_session(model_path)?,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, INPUT_SIZE);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let faces = decode(&self.anchors, reg_data, score_data, self.confidence);
        Ok(faces
            .iter()
            .map(|b| {
                BoundingBox::from_normalized(
                    b.xmin,
                    b.ymin,
                    b.width,
                    b.height,
                    frame.width(),
                    frame.height(),
                )
            })
            .collect())
    }
}

/// Decodes raw model output into NMS-filtered normalized boxes.
fn decode(
    anchors: &[[f32; 2]],
    reg_data: &[f32],
    score_data: &[f32],
    confidence: f64,
) -> Vec<NormalizedBox> {
    let mut candidates = Vec::new();
    let mut candidate_scores = Vec::new();
    let size = INPUT_SIZE as f32;

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score) as f64;
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / size;
        let cy = anchor[1] + reg_data[offset + 1] / size;
        let w = reg_data[offset + 2] / size;
        let h = reg_data[offset + 3] / size;

        candidates.push(NormalizedBox {
            xmin: (cx - w / 2.0) as f64,
            ymin: (cy - h / 2.0) as f64,
            width: w as f64,
            height: h as f64,
        });
        candidate_scores.push(score);
    }

    let corners: Vec<[f64; 4]> = candidates.iter().map(NormalizedBox::corners).collect();
    nms(&corners, &candidate_scores, NMS_IOU_THRESH)
        .into_iter()
        .map(|i| candidates[i])
        .collect()
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Anchors for the short-range model: a 16×16 grid with 2 anchors per cell
/// followed by an 8×8 grid with 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Logit that sigmoids to roughly `p`.
    fn logit(p: f32) -> f32 {
        (p / (1.0 - p)).ln()
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        assert_eq!(preprocess(&frame, 128).shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, 0);
        let tensor = preprocess(&frame, 128);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_generate_anchors_count_and_range() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        for a in &anchors {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_applies_confidence_threshold() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let mut reg = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        reg[2] = 32.0; // w = 0.25
        reg[3] = 64.0; // h = 0.5
        let scores = [logit(0.6), logit(0.2)];

        let boxes = decode(&anchors, &reg, &scores, 0.3);

        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].xmin, 0.375, epsilon = 1e-6);
        assert_relative_eq!(boxes[0].ymin, 0.25, epsilon = 1e-6);
        assert_relative_eq!(boxes[0].width, 0.25, epsilon = 1e-6);
        assert_relative_eq!(boxes[0].height, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_suppresses_duplicate_anchors() {
        // Same-cell anchors predict nearly the same box
        let anchors = vec![[0.5, 0.5], [0.5, 0.5]];
        let mut reg = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        for i in 0..2 {
            reg[i * REGRESSOR_STRIDE + 2] = 40.0;
            reg[i * REGRESSOR_STRIDE + 3] = 40.0;
        }
        reg[REGRESSOR_STRIDE] = 1.0;
        let scores = [logit(0.7), logit(0.9)];

        let boxes = decode(&anchors, &reg, &scores, 0.3);

        assert_eq!(boxes.len(), 1);
        // Higher-scoring second anchor wins
        assert!(boxes[0].xmin > 0.5 - 40.0 / 256.0);
    }

    #[test]
    fn test_decoded_box_maps_to_pixels_by_truncation() {
        let b = NormalizedBox {
            xmin: 0.375,
            ymin: 0.25,
            width: 0.25,
            height: 0.5,
        };
        let px = BoundingBox::from_normalized(b.xmin, b.ymin, b.width, b.height, 100, 60);
        assert_eq!(px, BoundingBox::new(37, 15, 62, 45));
    }

    #[test]
    fn test_decode_tolerates_short_regressor_output() {
        let anchors = vec![[0.5, 0.5], [0.5, 0.5]];
        let reg = vec![0.0f32; REGRESSOR_STRIDE];
        let scores = [logit(0.9), logit(0.9)];
        assert_eq!(decode(&anchors, &reg, &scores, 0.3).len(), 1);
    }
}
