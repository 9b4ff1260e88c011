//! YOLO output decoding and non-maximum suppression

use crate::label::{Label, NUM_LABELS};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Anchor-level early-reject threshold, also applied to the combined
/// objectness * class score. One constant by design: two observed model
/// exports disagreed on 0.45 vs 0.5 and this is the tunable resolution.
pub const CONFIDENCE_THRESHOLD: f32 = 0.45;

/// Boxes overlapping a kept box beyond this IOU are suppressed.
pub const IOU_THRESHOLD: f32 = 0.45;

/// Axis-aligned box in original-frame pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection-over-union. Zero-area pairs and degenerate overlaps
    /// yield 0.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// One candidate object found in a frame. Created fresh per inference call
/// and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub label: Label,
    /// Product of objectness (if present) and best class score, in [0,1]
    pub confidence: f32,
}

/// Decode a raw YOLO output buffer into pixel-space detections.
///
/// Layout is auto-detected: `dims = [1, C, A]` when `dims[1] < dims[2]`
/// (standard YOLOv8 export), otherwise `[1, A, C]` (transposed export).
/// A separate objectness channel is assumed iff `C == 5 + NUM_LABELS`.
/// Output is NMS-filtered and sorted by confidence descending.
pub fn decode_output(
    output: &[f32],
    dims: &[usize],
    original_width: f32,
    original_height: f32,
    input_size: f32,
) -> Vec<Detection> {
    if dims.len() < 3 {
        warn!(?dims, "invalid output dimensions");
        return Vec::new();
    }

    let (num_channels, num_anchors, transposed) = if dims[1] < dims[2] {
        (dims[1], dims[2], false)
    } else {
        (dims[2], dims[1], true)
    };

    if output.len() < num_channels * num_anchors {
        warn!(
            len = output.len(),
            num_channels, num_anchors, "output buffer shorter than its declared shape"
        );
        return Vec::new();
    }

    let has_objectness = num_channels == 5 + NUM_LABELS;
    let class_start = if has_objectness { 5 } else { 4 };

    let at = |anchor: usize, channel: usize| -> f32 {
        if transposed {
            output[anchor * num_channels + channel]
        } else {
            output[channel * num_anchors + anchor]
        }
    };

    let scale_x = original_width / input_size;
    let scale_y = original_height / input_size;

    let mut detections = Vec::new();
    for i in 0..num_anchors {
        let objectness = if has_objectness {
            let obj = at(i, 4);
            if obj < CONFIDENCE_THRESHOLD {
                continue;
            }
            obj
        } else {
            1.0
        };

        let mut best_score = f32::NEG_INFINITY;
        let mut best_class = None;
        for c in 0..NUM_LABELS {
            if class_start + c >= num_channels {
                break;
            }
            let score = at(i, class_start + c);
            if score > best_score {
                best_score = score;
                best_class = Label::from_index(c);
            }
        }

        let confidence = objectness * best_score;
        let Some(label) = best_class else { continue };
        if confidence < CONFIDENCE_THRESHOLD {
            continue;
        }

        // Anchor box is (cx, cy, w, h) in model input space.
        let cx = at(i, 0);
        let cy = at(i, 1);
        let w = at(i, 2);
        let h = at(i, 3);

        detections.push(Detection {
            bounding_box: BoundingBox {
                x: (cx - w / 2.0) * scale_x,
                y: (cy - h / 2.0) * scale_y,
                width: w * scale_x,
                height: h * scale_y,
            },
            label,
            confidence,
        });
    }

    non_max_suppression(detections, IOU_THRESHOLD)
}

/// Greedy NMS: keep the highest-confidence box, suppress everything
/// overlapping it beyond `iou_threshold`, repeat. Result stays sorted by
/// confidence descending.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..detections.len() {
            if suppressed[j] {
                continue;
            }
            if detections[i].bounding_box.iou(&detections[j].bounding_box) > iou_threshold {
                suppressed[j] = true;
            }
        }
        keep.push(detections[i].clone());
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
        }
    }

    fn det(b: BoundingBox, label: Label, confidence: f32) -> Detection {
        Detection {
            bounding_box: b,
            label,
            confidence,
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = bbox(10.0, 10.0, 20.0, 20.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_zero_area_boxes() {
        let a = bbox(5.0, 5.0, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlap_and_is_idempotent() {
        let dets = vec![
            det(bbox(0.0, 0.0, 10.0, 10.0), Label::Drowsy, 0.9),
            det(bbox(1.0, 1.0, 10.0, 10.0), Label::Drowsy, 0.8),
            det(bbox(100.0, 100.0, 10.0, 10.0), Label::Phone, 0.7),
        ];
        let kept = non_max_suppression(dets, IOU_THRESHOLD);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label, Label::Drowsy);
        assert_eq!(kept[1].label, Label::Phone);

        let again = non_max_suppression(kept.clone(), IOU_THRESHOLD);
        assert_eq!(again.len(), kept.len());
        for (a, b) in again.iter().zip(kept.iter()) {
            assert_eq!(a.bounding_box, b.bounding_box);
        }
    }

    #[test]
    fn test_nms_orders_by_confidence() {
        let dets = vec![
            det(bbox(100.0, 0.0, 5.0, 5.0), Label::Yawn, 0.5),
            det(bbox(0.0, 0.0, 5.0, 5.0), Label::Awake, 0.95),
        ];
        let kept = non_max_suppression(dets, IOU_THRESHOLD);
        assert_eq!(kept[0].label, Label::Awake);
        assert_eq!(kept[1].label, Label::Yawn);
    }

    /// Anchor-major `[1, 8400, 12]` (objectness layout) with one confident
    /// anchor for class `drowsy`.
    #[test]
    fn test_decode_anchor_major_with_objectness() {
        let num_anchors = 8400;
        let num_channels = 12;
        let mut output = vec![0.0f32; num_anchors * num_channels];

        // Anchor 100: box at input-space center (320, 320), 64x64,
        // objectness 0.9, class 2 (drowsy) score 1.0.
        let base = 100 * num_channels;
        output[base] = 320.0;
        output[base + 1] = 320.0;
        output[base + 2] = 64.0;
        output[base + 3] = 64.0;
        output[base + 4] = 0.9;
        output[base + 5 + 2] = 1.0;

        let dets = decode_output(&output, &[1, num_anchors, num_channels], 640.0, 480.0, 640.0);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!(d.label, Label::Drowsy);
        assert!((d.confidence - 0.9).abs() < 1e-6);
        // Rescaled by (640/640, 480/640)
        assert!((d.bounding_box.x - 288.0).abs() < 1e-3);
        assert!((d.bounding_box.y - (320.0 - 32.0) * 0.75).abs() < 1e-3);
        assert!((d.bounding_box.width - 64.0).abs() < 1e-3);
        assert!((d.bounding_box.height - 48.0).abs() < 1e-3);
    }

    /// Channel-major `[1, 11, A]` (no objectness) export variant.
    #[test]
    fn test_decode_channel_major_without_objectness() {
        let num_anchors = 100;
        let num_channels = 11;
        let mut output = vec![0.0f32; num_channels * num_anchors];

        let anchor = 7;
        output[anchor] = 100.0; // cx
        output[num_anchors + anchor] = 200.0; // cy
        output[2 * num_anchors + anchor] = 40.0; // w
        output[3 * num_anchors + anchor] = 80.0; // h
        output[(4 + 6) * num_anchors + anchor] = 0.8; // class 6 = yawn

        let dets = decode_output(&output, &[1, num_channels, num_anchors], 640.0, 640.0, 640.0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, Label::Yawn);
        assert!((dets[0].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_below_threshold() {
        let num_anchors = 10;
        let num_channels = 11;
        let mut output = vec![0.0f32; num_channels * num_anchors];
        output[4 * num_anchors] = 0.4; // class 0 score below 0.45

        let dets = decode_output(&output, &[1, num_channels, num_anchors], 640.0, 640.0, 640.0);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_invalid_dims() {
        assert!(decode_output(&[0.0; 8], &[1, 8], 640.0, 640.0, 640.0).is_empty());
        assert!(decode_output(&[0.0; 8], &[1, 11, 100], 640.0, 640.0, 640.0).is_empty());
    }
}
