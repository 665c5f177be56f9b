//! Box geometry shared by the ONNX detection backends.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy non-maximum suppression.
///
/// Returns the indices of the kept boxes, highest score first. A box is
/// dropped when its IoU with an already kept box exceeds `iou_thresh`.
pub fn nms(boxes: &[[f64; 4]], scores: &[f64], iou_thresh: f64) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        if keep
            .iter()
            .all(|&k| bbox_iou(&boxes[k], &boxes[i]) <= iou_thresh)
        {
            keep.push(i);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&a, &a), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        assert_relative_eq!(bbox_iou(&a, &b), 25.0 / 175.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_score() {
        let boxes = [[0.0, 0.0, 100.0, 100.0], [5.0, 5.0, 105.0, 105.0]];
        let kept = nms(&boxes, &[0.7, 0.9], 0.3);
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn test_nms_keeps_separate_boxes_by_score() {
        let boxes = [[0.0, 0.0, 50.0, 50.0], [200.0, 200.0, 250.0, 250.0]];
        let kept = nms(&boxes, &[0.8, 0.9], 0.3);
        assert_eq!(kept, vec![1, 0]);
    }

    #[test]
    fn test_nms_threshold_is_exclusive() {
        // IoU = 25/175 ≈ 0.143
        let boxes = [[0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 15.0, 15.0]];
        assert_eq!(nms(&boxes, &[0.9, 0.8], 0.5).len(), 2);
        assert_eq!(nms(&boxes, &[0.9, 0.8], 0.1).len(), 1);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(&[], &[], 0.45).is_empty());
    }
}
