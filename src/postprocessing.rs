// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection post-processing.
//!
//! Decodes the raw model output tensor into confidence-filtered,
//! NMS-deduplicated bounding boxes in original image coordinates.

use ndarray::{Array2, ArrayView2, s};

use crate::inference::InferenceConfig;
use crate::preprocessing::{PreprocessResult, clip_coords, scale_coords};
use crate::results::Boxes;
use crate::utils::nms_per_class;

/// Decode raw detection output into [`Boxes`].
///
/// YOLO detection models output shape is typically [1, 84, 8400] where
/// 84 = 4 (bbox) + 80 (classes) and 8400 is the number of predictions.
/// Both [1, 4+nc, N] and [1, N, 4+nc] layouts are handled.
#[must_use]
pub fn decode_detections(
    output: &[f32],
    output_shape: &[usize],
    preprocess: &PreprocessResult,
    config: &InferenceConfig,
    expected_classes: usize,
) -> Boxes {
    let (num_classes, num_predictions, is_transposed) =
        parse_detect_shape(output_shape, expected_classes);

    if output.is_empty() || num_predictions == 0 {
        return Boxes::empty(preprocess.orig_shape);
    }

    // Convert flat output to a (num_preds, num_features) array
    let output_2d = if is_transposed {
        Array2::from_shape_vec((num_predictions, 4 + num_classes), output.to_vec())
            .unwrap_or_else(|_| Array2::zeros((0, 0)))
    } else {
        let arr = Array2::from_shape_vec((4 + num_classes, num_predictions), output.to_vec())
            .unwrap_or_else(|_| Array2::zeros((0, 0)));
        arr.t().to_owned()
    };

    if output_2d.is_empty() {
        return Boxes::empty(preprocess.orig_shape);
    }

    let data = extract_detect_boxes(output_2d.view(), preprocess, config);
    Boxes::new(data, preprocess.orig_shape)
}

/// Parse detection output shape to determine format.
///
/// Derives class count from the output shape when metadata is missing
/// (`expected_classes == 0`). Returns `(num_classes, num_predictions,
/// is_transposed)`.
fn parse_detect_shape(shape: &[usize], expected_classes: usize) -> (usize, usize, bool) {
    match shape.len() {
        2 => {
            let (a, b) = (shape[0], shape[1]);
            if a < 4 && b < 4 {
                return (expected_classes.max(1), 0, false);
            }
            if expected_classes == 0 {
                // No metadata - the smaller dimension is num_features
                let (num_features, num_preds, transposed) =
                    if a < b { (a, b, false) } else { (b, a, true) };
                return (num_features.saturating_sub(4).max(1), num_preds, transposed);
            }
            if a == 4 + expected_classes || (a >= 4 && a > b) {
                (a.saturating_sub(4), b, false)
            } else {
                (b.saturating_sub(4), a, true)
            }
        }
        3 => {
            // [batch, ...] - ignore batch dimension
            let (a, b) = (shape[1], shape[2]);
            if b == 0 || a < 4 {
                return (expected_classes.max(1), 0, false);
            }
            if expected_classes == 0 {
                let (num_features, num_preds, transposed) =
                    if a < b { (a, b, false) } else { (b, a, true) };
                return (num_features.saturating_sub(4).max(1), num_preds, transposed);
            }
            if a == 4 + expected_classes || (expected_classes > 0 && a < b) {
                (a.saturating_sub(4), b, false)
            } else {
                (b.saturating_sub(4), a, true)
            }
        }
        _ => (expected_classes.max(1), 0, false),
    }
}

/// Extract detection boxes from a (num_preds, 4 + nc) prediction array.
fn extract_detect_boxes(
    output: ArrayView2<'_, f32>,
    preprocess: &PreprocessResult,
    config: &InferenceConfig,
) -> Array2<f32> {
    let num_predictions = output.nrows();
    let mut candidates = Vec::new();

    for i in 0..num_predictions {
        // Class scores are columns 4 onwards
        let class_scores = output.slice(s![i, 4..]);

        // Find best class (treat NaN as lowest to avoid panic)
        let (best_class, best_score) = class_scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Less))
            .map(|(idx, &score)| (idx, if score.is_nan() { 0.0 } else { score }))
            .unwrap_or((0, 0.0));

        if best_score < config.confidence_threshold {
            continue;
        }

        // Model outputs boxes as center xywh
        let cx = output[[i, 0]];
        let cy = output[[i, 1]];
        let w = output[[i, 2]];
        let h = output[[i, 3]];

        let xyxy = [
            cx - w / 2.0,
            cy - h / 2.0,
            cx + w / 2.0,
            cy + h / 2.0,
        ];

        // Back-project to original image space and clip
        let scaled = scale_coords(&xyxy, preprocess.scale, preprocess.padding);
        let clipped = clip_coords(&scaled, preprocess.orig_shape);

        candidates.push((clipped, best_score, best_class));
    }

    if candidates.is_empty() {
        return Array2::zeros((0, 6));
    }

    // Per-class NMS (only suppress boxes within the same class)
    let keep_indices = nms_per_class(&candidates, config.iou_threshold);

    let num_kept = keep_indices.len().min(config.max_detections);
    let mut result = Array2::zeros((num_kept, 6));

    #[allow(clippy::cast_precision_loss)]
    for (out_idx, &keep_idx) in keep_indices.iter().take(num_kept).enumerate() {
        let (bbox, score, class) = &candidates[keep_idx];
        result[[out_idx, 0]] = bbox[0];
        result[[out_idx, 1]] = bbox[1];
        result[[out_idx, 2]] = bbox[2];
        result[[out_idx, 3]] = bbox[3];
        result[[out_idx, 4]] = *score;
        result[[out_idx, 5]] = *class as f32;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    /// Identity preprocessing transform over a 640x640 image.
    fn identity_preprocess() -> PreprocessResult {
        PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            orig_shape: (640, 640),
            scale: (1.0, 1.0),
            padding: (0.0, 0.0),
        }
    }

    /// Build a flat [1, 4+nc, N] output with the given predictions.
    /// Each prediction: (cx, cy, w, h, scores...).
    fn build_output(preds: &[(f32, f32, f32, f32, Vec<f32>)]) -> (Vec<f32>, Vec<usize>) {
        let nc = preds[0].4.len();
        let n = preds.len();
        let mut flat = vec![0.0; (4 + nc) * n];
        for (i, (cx, cy, w, h, scores)) in preds.iter().enumerate() {
            flat[i] = *cx;
            flat[n + i] = *cy;
            flat[2 * n + i] = *w;
            flat[3 * n + i] = *h;
            for (c, s) in scores.iter().enumerate() {
                flat[(4 + c) * n + i] = *s;
            }
        }
        (flat, vec![1, 4 + nc, n])
    }

    #[test]
    fn test_parse_detect_shape() {
        // [1, 84, 8400] - feature-major
        assert_eq!(parse_detect_shape(&[1, 84, 8400], 80), (80, 8400, false));
        // [1, 8400, 84] - prediction-major
        assert_eq!(parse_detect_shape(&[1, 8400, 84], 80), (80, 8400, true));
        // No metadata - infer from shape
        assert_eq!(parse_detect_shape(&[1, 84, 8400], 0), (80, 8400, false));
    }

    #[test]
    fn test_decode_filters_by_confidence() {
        let preprocess = identity_preprocess();
        let config = InferenceConfig::new().with_confidence(0.5);

        let (output, shape) = build_output(&[
            (100.0, 100.0, 50.0, 50.0, vec![0.9, 0.05]), // kept, class 0
            (300.0, 300.0, 40.0, 40.0, vec![0.1, 0.2]),  // below threshold
        ]);

        let boxes = decode_detections(&output, &shape, &preprocess, &config, 2);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes.cls()[0], 0.0);
        assert!((boxes.conf()[0] - 0.9).abs() < 1e-6);
        // xywh (100, 100, 50, 50) -> xyxy (75, 75, 125, 125)
        assert_eq!(boxes.xyxy()[[0, 0]], 75.0);
        assert_eq!(boxes.xyxy()[[0, 3]], 125.0);
    }

    #[test]
    fn test_decode_applies_nms() {
        let preprocess = identity_preprocess();
        let config = InferenceConfig::new().with_confidence(0.25);

        // Two heavily overlapping same-class boxes; one distinct box
        let (output, shape) = build_output(&[
            (100.0, 100.0, 50.0, 50.0, vec![0.9]),
            (102.0, 102.0, 50.0, 50.0, vec![0.8]),
            (400.0, 400.0, 50.0, 50.0, vec![0.7]),
        ]);

        let boxes = decode_detections(&output, &shape, &preprocess, &config, 1);
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn test_decode_back_projects_coordinates() {
        // Letterbox of a 1280x720 image into 640x640: scale 0.5, pad_top 140
        let preprocess = PreprocessResult {
            tensor: Array4::zeros((1, 3, 640, 640)),
            orig_shape: (720, 1280),
            scale: (0.5, 0.5),
            padding: (140.0, 0.0),
        };
        let config = InferenceConfig::new().with_confidence(0.25);

        let (output, shape) = build_output(&[(320.0, 340.0, 100.0, 100.0, vec![0.9])]);
        let boxes = decode_detections(&output, &shape, &preprocess, &config, 1);
        assert_eq!(boxes.len(), 1);
        // Letterbox (270, 290, 370, 390) -> original (540, 300, 740, 500)
        assert_eq!(boxes.xyxy()[[0, 0]], 540.0);
        assert_eq!(boxes.xyxy()[[0, 1]], 300.0);
        assert_eq!(boxes.xyxy()[[0, 2]], 740.0);
        assert_eq!(boxes.xyxy()[[0, 3]], 500.0);
    }

    #[test]
    fn test_decode_empty_output() {
        let preprocess = identity_preprocess();
        let config = InferenceConfig::new();
        let boxes = decode_detections(&[], &[1, 84, 0], &preprocess, &config, 80);
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_max_detections_cap() {
        let preprocess = identity_preprocess();
        let config = InferenceConfig::new().with_confidence(0.1).with_max_detections(2);

        let (output, shape) = build_output(&[
            (100.0, 100.0, 20.0, 20.0, vec![0.9]),
            (200.0, 200.0, 20.0, 20.0, vec![0.8]),
            (300.0, 300.0, 20.0, 20.0, vec![0.7]),
        ]);

        let boxes = decode_detections(&output, &shape, &preprocess, &config, 1);
        assert_eq!(boxes.len(), 2);
    }
}
