// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result containers for detection output.
//!
//! [`Detections`] holds everything a displayed frame needs: the filtered
//! bounding boxes, the class-name map, and per-stage timings.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, ArrayView2, s};

use crate::utils::pluralize;

/// Timing information for inference operations (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on model inference.
    pub inference: Option<f64>,
    /// Time spent on postprocessing.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new `Speed` instance with all timings in milliseconds.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }

    /// Total time across all stages in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0)
            + self.inference.unwrap_or(0.0)
            + self.postprocess.unwrap_or(0.0)
    }
}

/// Detection bounding boxes.
///
/// Stores boxes in xyxy format along with confidence scores and class IDs,
/// matching the Ultralytics `Boxes` layout.
#[derive(Debug, Clone)]
pub struct Boxes {
    /// Raw data array with shape (N, 6) containing [x1, y1, x2, y2, conf, cls].
    pub data: Array2<f32>,
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
}

impl Boxes {
    /// Create a new `Boxes` instance.
    ///
    /// # Arguments
    ///
    /// * `data` - Array with shape (N, 6) containing box data.
    /// * `orig_shape` - Original image shape (height, width).
    #[must_use]
    pub fn new(data: Array2<f32>, orig_shape: (u32, u32)) -> Self {
        Self { data, orig_shape }
    }

    /// Create an empty `Boxes` instance.
    #[must_use]
    pub fn empty(orig_shape: (u32, u32)) -> Self {
        Self::new(Array2::zeros((0, 6)), orig_shape)
    }

    /// Get the number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Check if there are no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get boxes in xyxy format, shape (N, 4).
    #[must_use]
    pub fn xyxy(&self) -> ArrayView2<'_, f32> {
        self.data.slice(s![.., 0..4])
    }

    /// Get confidence scores, shape (N,).
    #[must_use]
    pub fn conf(&self) -> ArrayView1<'_, f32> {
        self.data.column(4)
    }

    /// Get class IDs as floats, shape (N,).
    #[must_use]
    pub fn cls(&self) -> ArrayView1<'_, f32> {
        self.data.column(5)
    }
}

/// Detection results for a single frame.
#[derive(Debug, Clone)]
pub struct Detections {
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
    /// Filtered, NMS-deduplicated bounding boxes in original image coordinates.
    pub boxes: Boxes,
    /// Class ID to name mapping.
    pub names: HashMap<usize, String>,
    /// Inference timing information.
    pub speed: Speed,
}

impl Detections {
    /// Create a new `Detections` instance.
    #[must_use]
    pub fn new(
        boxes: Boxes,
        names: HashMap<usize, String>,
        speed: Speed,
        orig_shape: (u32, u32),
    ) -> Self {
        Self {
            orig_shape,
            boxes,
            names,
            speed,
        }
    }

    /// Get the number of detections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Check if there are no detections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Class name for a detection row, falling back to `"object"`.
    #[must_use]
    pub fn class_name(&self, row: usize) -> &str {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let class_id = self.boxes.cls()[row] as usize;
        self.names.get(&class_id).map_or("object", String::as_str)
    }

    /// Generate a per-class count summary string (e.g. "2 persons, 1 bus").
    #[must_use]
    pub fn verbose(&self) -> String {
        if self.is_empty() {
            return "(no detections)".to_string();
        }

        let cls = self.boxes.cls();
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for &c in cls {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let c = c as usize;
            *counts.entry(c).or_insert(0) += 1;
        }

        // Sort by class ID for consistent output
        let mut sorted_counts: Vec<(usize, usize)> = counts.into_iter().collect();
        sorted_counts.sort_by_key(|(class_id, _)| *class_id);

        let parts: Vec<String> = sorted_counts
            .iter()
            .map(|(class_id, count)| {
                let class_name = self.names.get(class_id).map_or("object", String::as_str);
                let name = if *count > 1 {
                    pluralize(class_name)
                } else {
                    class_name.to_string()
                };
                format!("{count} {name}")
            })
            .collect();

        parts.join(", ")
    }

    /// One text line per detection with class, confidence, and corner
    /// coordinates, e.g. `"person 0.87  (34, 50) - (210, 388)"`.
    ///
    /// Coordinates are rounded to integers, identical to the pixel
    /// coordinates of the drawn rectangles.
    #[must_use]
    pub fn box_lines(&self) -> Vec<String> {
        let xyxy = self.boxes.xyxy();
        let conf = self.boxes.conf();

        (0..self.len())
            .map(|i| {
                #[allow(clippy::cast_possible_truncation)]
                let (x1, y1, x2, y2) = (
                    xyxy[[i, 0]].round() as i64,
                    xyxy[[i, 1]].round() as i64,
                    xyxy[[i, 2]].round() as i64,
                    xyxy[[i, 3]].round() as i64,
                );
                format!(
                    "{} {:.2}  ({x1}, {y1}) - ({x2}, {y2})",
                    self.class_name(i),
                    conf[i]
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_names() -> HashMap<usize, String> {
        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        names.insert(2, "bus".to_string());
        names
    }

    fn detections_from_rows(rows: Vec<f32>, n: usize) -> Detections {
        let data = Array2::from_shape_vec((n, 6), rows).unwrap();
        Detections::new(
            Boxes::new(data, (480, 640)),
            create_names(),
            Speed::default(),
            (480, 640),
        )
    }

    #[test]
    fn test_boxes_accessors() {
        let det = detections_from_rows(vec![10.0, 20.0, 110.0, 220.0, 0.9, 0.0], 1);
        assert_eq!(det.len(), 1);
        assert_eq!(det.boxes.xyxy()[[0, 3]], 220.0);
        assert_eq!(det.boxes.conf()[0], 0.9);
        assert_eq!(det.boxes.cls()[0], 0.0);
        assert_eq!(det.class_name(0), "person");
    }

    #[test]
    fn test_verbose_counts() {
        let det = detections_from_rows(
            vec![
                10.0, 10.0, 100.0, 100.0, 0.95, 0.0, // person
                20.0, 20.0, 200.0, 200.0, 0.90, 0.0, // person
                30.0, 30.0, 300.0, 300.0, 0.85, 2.0, // bus
            ],
            3,
        );
        assert_eq!(det.verbose(), "2 persons, 1 bus");
    }

    #[test]
    fn test_verbose_empty() {
        let det = Detections::new(
            Boxes::empty((480, 640)),
            create_names(),
            Speed::default(),
            (480, 640),
        );
        assert!(det.is_empty());
        assert_eq!(det.verbose(), "(no detections)");
        assert!(det.box_lines().is_empty());
    }

    #[test]
    fn test_box_lines() {
        let det = detections_from_rows(vec![10.4, 20.6, 110.0, 220.0, 0.88, 0.0], 1);
        let lines = det.box_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "person 0.88  (10, 21) - (110, 220)");
    }

    #[test]
    fn test_unknown_class_falls_back() {
        let det = detections_from_rows(vec![0.0, 0.0, 1.0, 1.0, 0.5, 99.0], 1);
        assert_eq!(det.class_name(0), "object");
        assert_eq!(det.verbose(), "1 object");
    }

    #[test]
    fn test_speed_total() {
        let speed = Speed::new(1.0, 2.0, 3.0);
        assert!((speed.total() - 6.0).abs() < f64::EPSILON);
    }
}
