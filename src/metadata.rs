// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model metadata parsing.
//!
//! Ultralytics models embed their configuration (class names, input size,
//! task type) as YAML in the ONNX custom metadata properties. This module
//! parses that block and validates that the model is a detection model.

use std::collections::HashMap;

use crate::error::{Result, ViewerError};

/// Metadata extracted from an Ultralytics YOLO ONNX model.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    /// Model description (e.g., "Ultralytics YOLO11n model trained on coco.yaml").
    pub description: String,
    /// Ultralytics version used for export.
    pub version: String,
    /// The task this model performs. The viewer only accepts `"detect"`.
    pub task: String,
    /// Model stride (typically 32 for YOLO).
    pub stride: u32,
    /// Input image size as (height, width).
    pub imgsz: (usize, usize),
    /// Class ID to class name mapping.
    pub names: HashMap<usize, String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            version: String::new(),
            task: "detect".to_string(),
            stride: 32,
            imgsz: (640, 640),
            names: HashMap::new(),
        }
    }
}

impl ModelMetadata {
    /// Parse metadata from ONNX model custom metadata properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is malformed.
    pub fn from_onnx_metadata(metadata_map: &HashMap<String, String>) -> Result<Self> {
        // The metadata is typically stored under a single key containing YAML
        let yaml_str = metadata_map
            .get("metadata")
            .or_else(|| metadata_map.get("model_metadata"))
            .or_else(|| metadata_map.values().find(|v| v.contains("task:")));

        match yaml_str {
            Some(yaml) => Self::from_yaml_str(yaml),
            // Models without Ultralytics metadata still run with defaults
            None => Ok(Self::default()),
        }
    }

    /// Parse metadata from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if a present field is malformed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        // Parse YAML manually to avoid a serde_yaml dependency
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                let value = value.trim().trim_matches('\'').trim_matches('"');

                match key {
                    "description" => metadata.description = value.to_string(),
                    "version" => metadata.version = value.to_string(),
                    "task" => metadata.task = value.to_string(),
                    "stride" => {
                        metadata.stride = value.parse().map_err(|_| {
                            ViewerError::MetadataError(format!("Invalid stride value: {value}"))
                        })?;
                    }
                    _ => {
                        // Class name entries have numeric keys
                        if let Ok(class_id) = key.parse::<usize>() {
                            metadata.names.insert(class_id, value.to_string());
                        }
                    }
                }
            }
        }

        if let Some(imgsz_line) = yaml_str.lines().find(|l| l.contains("imgsz:")) {
            metadata.imgsz = Self::parse_imgsz(yaml_str, imgsz_line);
        }

        if metadata.names.is_empty() {
            metadata.names = Self::parse_names_block(yaml_str);
        }

        Ok(metadata)
    }

    /// Parse the imgsz field, which can be inline (`imgsz: [640, 640]`) or a
    /// multi-line YAML list.
    fn parse_imgsz(yaml_str: &str, imgsz_line: &str) -> (usize, usize) {
        if let (Some(bracket_start), Some(bracket_end)) =
            (imgsz_line.find('['), imgsz_line.find(']'))
        {
            let values: Vec<usize> = imgsz_line[bracket_start + 1..bracket_end]
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if values.len() >= 2 {
                return (values[0], values[1]);
            }
        }

        // Multi-line YAML list format
        let lines: Vec<&str> = yaml_str.lines().collect();
        let mut imgsz_values = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if line.contains("imgsz:") {
                for following in lines.iter().skip(i + 1) {
                    let trimmed = following.trim();
                    if trimmed.starts_with('-') {
                        if let Ok(val) = trimmed.trim_start_matches('-').trim().parse::<usize>() {
                            imgsz_values.push(val);
                        }
                    } else if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        break;
                    }
                    if imgsz_values.len() >= 2 {
                        break;
                    }
                }
                break;
            }
        }

        if imgsz_values.len() >= 2 {
            (imgsz_values[0], imgsz_values[1])
        } else {
            (640, 640)
        }
    }

    /// Parse the names block from YAML block or Python dict format.
    fn parse_names_block(yaml_str: &str) -> HashMap<usize, String> {
        // Ultralytics stores names as a Python dict: `names: {0: 'person', ...}`
        if let Some(start) = yaml_str.find("names:") {
            let trimmed = yaml_str[start + 6..].trim();
            if trimmed.starts_with('{') {
                if let Some(end) = trimmed.find('}') {
                    return Self::parse_python_dict(&trimmed[1..end]);
                }
            }
        }

        // Fall back to YAML block format
        let mut names = HashMap::new();
        let mut in_names_block = false;
        let mut names_indent = 0;

        for line in yaml_str.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with("names:") {
                in_names_block = true;
                names_indent = line.len() - line.trim_start().len();
                continue;
            }

            if in_names_block {
                let current_indent = line.len() - line.trim_start().len();

                if !trimmed.is_empty() && !trimmed.starts_with('#') && current_indent <= names_indent
                {
                    if !trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                        break;
                    }
                }

                if let Some((key, value)) = trimmed.split_once(':') {
                    if let Ok(class_id) = key.trim().parse::<usize>() {
                        let class_name = value.trim().trim_matches('\'').trim_matches('"');
                        names.insert(class_id, class_name.to_string());
                    }
                }
            }
        }

        names
    }

    /// Parse a Python dict string like `0: 'person', 1: 'bicycle'`.
    fn parse_python_dict(dict_str: &str) -> HashMap<usize, String> {
        let mut names = HashMap::new();

        for entry in dict_str.split(',') {
            if let Some((key, value)) = entry.trim().split_once(':') {
                let value = value.trim().trim_matches('\'').trim_matches('"');
                if let Ok(class_id) = key.trim().parse::<usize>() {
                    names.insert(class_id, value.to_string());
                }
            }
        }

        names
    }

    /// Validate that this model performs object detection.
    ///
    /// # Errors
    ///
    /// Returns a `ModelLoadError` for segmentation, pose, classification, or
    /// OBB models - the viewer renders boxes only.
    pub fn ensure_detect(&self) -> Result<()> {
        if self.task == "detect" {
            Ok(())
        } else {
            Err(ViewerError::ModelLoadError(format!(
                "Model task is '{}', but the viewer only supports 'detect' models",
                self.task
            )))
        }
    }

    /// Get the number of classes in this model.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.names.len()
    }

    /// Get a class name by ID.
    #[must_use]
    pub fn class_name(&self, class_id: usize) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = "\
description: Ultralytics YOLO11n model trained on coco.yaml
version: 8.3.0
task: detect
stride: 32
imgsz: [640, 640]
names: {0: 'person', 1: 'bicycle', 2: 'car'}
";

    #[test]
    fn test_parse_yaml_metadata() {
        let meta = ModelMetadata::from_yaml_str(SAMPLE_YAML).unwrap();
        assert_eq!(meta.task, "detect");
        assert_eq!(meta.stride, 32);
        assert_eq!(meta.imgsz, (640, 640));
        assert_eq!(meta.num_classes(), 3);
        assert_eq!(meta.class_name(0), Some("person"));
        assert_eq!(meta.class_name(2), Some("car"));
        assert!(meta.ensure_detect().is_ok());
    }

    #[test]
    fn test_parse_names_yaml_block() {
        let yaml = "task: detect\nnames:\n  0: cat\n  1: dog\n";
        let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(meta.class_name(1), Some("dog"));
    }

    #[test]
    fn test_non_detect_task_rejected() {
        let meta = ModelMetadata::from_yaml_str("task: segment\n").unwrap();
        assert!(meta.ensure_detect().is_err());
    }

    #[test]
    fn test_invalid_stride() {
        let result = ModelMetadata::from_yaml_str("stride: abc\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let meta = ModelMetadata::from_onnx_metadata(&HashMap::new()).unwrap();
        assert_eq!(meta.imgsz, (640, 640));
        assert_eq!(meta.task, "detect");
        assert!(meta.names.is_empty());
    }

    #[test]
    fn test_combined_key_metadata() {
        let mut map = HashMap::new();
        map.insert(String::new(), SAMPLE_YAML.to_string());
        let meta = ModelMetadata::from_onnx_metadata(&map).unwrap();
        assert_eq!(meta.num_classes(), 3);
    }
}
