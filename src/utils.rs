// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Utility functions shared across the viewer.

use image::DynamicImage;
use ndarray::Array3;

use crate::error::{Result, ViewerError};

/// Calculate `IoU` (Intersection over Union) between two bounding boxes.
///
/// # Arguments
///
/// * `box1` - First bounding box [x1, y1, x2, y2]
/// * `box2` - Second bounding box [x1, y1, x2, y2]
///
/// # Returns
///
/// `IoU` value between 0.0 and 1.0
#[must_use]
pub fn calculate_iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = ((x2 - x1).max(0.0)) * ((y2 - y1).max(0.0));

    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Per-class Non-Maximum Suppression (NMS) for filtering overlapping detections.
///
/// Only suppresses boxes within the same class, matching Ultralytics behavior.
///
/// # Arguments
///
/// * `boxes` - Vector of bounding boxes with scores and class IDs [(bbox, score, `class_id`)]
/// * `iou_threshold` - `IoU` threshold for suppression
///
/// # Returns
///
/// Indices of boxes to keep
///
/// # Panics
///
/// Panics if `partial_cmp` fails for floating point comparisons (e.g. NaN).
#[must_use]
pub fn nms_per_class(boxes: &[([f32; 4], f32, usize)], iou_threshold: f32) -> Vec<usize> {
    if boxes.is_empty() {
        return vec![];
    }

    // Sort by score (descending)
    let mut indices: Vec<usize> = (0..boxes.len()).collect();
    indices.sort_by(|&a, &b| boxes[b].1.partial_cmp(&boxes[a].1).unwrap());

    let mut keep = vec![];
    let mut suppressed = vec![false; boxes.len()];

    for &i in &indices {
        if suppressed[i] {
            continue;
        }
        keep.push(i);

        let class_i = boxes[i].2;

        for &j in &indices {
            if !suppressed[j] && i != j && boxes[j].2 == class_i {
                let iou = calculate_iou(&boxes[i].0, &boxes[j].0);
                if iou > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    keep
}

/// Simple pluralization for common COCO class names.
#[must_use]
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => "persons".to_string(),
        "bus" => "buses".to_string(),
        "knife" => "knives".to_string(),
        "mouse" => "mice".to_string(),
        "sheep" => "sheep".to_string(),
        "skis" => "skis".to_string(),
        _ => {
            if word.ends_with('s') || word.ends_with("ch") || word.ends_with("sh") {
                format!("{word}es")
            } else if word.ends_with('y') && !word.ends_with("ey") && !word.ends_with("ay") {
                format!("{}ies", &word[..word.len() - 1])
            } else {
                format!("{word}s")
            }
        }
    }
}

/// Convert an HWC u8 array to a `DynamicImage`.
///
/// # Errors
///
/// Returns an error if dimensions are invalid or conversion fails.
pub fn array_to_image(arr: &Array3<u8>) -> Result<DynamicImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0])
        .map_err(|_| ViewerError::ImageError("Image height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(shape[1])
        .map_err(|_| ViewerError::ImageError("Image width exceeds u32::MAX".to_string()))?;

    let mut rgb_data = Vec::with_capacity((height * width * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            rgb_data.push(arr[[y, x, 0]]);
            rgb_data.push(arr[[y, x, 1]]);
            rgb_data.push(arr[[y, x, 2]]);
        }
    }

    let img_buffer = image::RgbImage::from_raw(width, height, rgb_data)
        .ok_or_else(|| ViewerError::ImageError("Failed to create image from array".to_string()))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_iou() {
        let box1 = [0.0, 0.0, 10.0, 10.0];
        let box2 = [5.0, 5.0, 15.0, 15.0];
        let iou = calculate_iou(&box1, &box2);
        assert!((iou - 0.142_857).abs() < 0.001); // 25 / (100 + 100 - 25)
    }

    #[test]
    fn test_iou_disjoint() {
        let box1 = [0.0, 0.0, 10.0, 10.0];
        let box2 = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(calculate_iou(&box1, &box2), 0.0);
    }

    #[test]
    fn test_nms_per_class() {
        // Two overlapping boxes of different classes should both be kept
        let boxes = vec![
            ([0.0, 0.0, 10.0, 10.0], 0.9, 0),        // class 0
            ([1.0, 1.0, 11.0, 11.0], 0.8, 1),        // class 1 (different class)
            ([100.0, 100.0, 110.0, 110.0], 0.95, 0), // class 0, non-overlapping
        ];
        let keep = nms_per_class(&boxes, 0.5);
        assert_eq!(keep.len(), 3);
    }

    #[test]
    fn test_nms_per_class_suppression() {
        // Two overlapping boxes of the same class - lower score suppressed
        let boxes = vec![
            ([0.0, 0.0, 10.0, 10.0], 0.9, 0),
            ([1.0, 1.0, 11.0, 11.0], 0.8, 0),
        ];
        let keep = nms_per_class(&boxes, 0.5);
        assert_eq!(keep.len(), 1);
        assert!(keep.contains(&0));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("person"), "persons");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("car"), "cars");
        assert_eq!(pluralize("sheep"), "sheep");
    }

    #[test]
    fn test_array_to_image() {
        let arr = Array3::<u8>::zeros((4, 6, 3));
        let img = array_to_image(&arr).unwrap();
        assert_eq!(img.width(), 6);
        assert_eq!(img.height(), 4);
    }
}
