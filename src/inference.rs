// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference configuration.
//!
//! This module defines the [`InferenceConfig`] struct, which controls the
//! confidence threshold, Non-Maximum Suppression (NMS), input image sizing,
//! and hardware execution options used by the detector.

use crate::device::Device;

/// Configuration for detection inference.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use ultralytics_viewer::InferenceConfig;
///
/// let config = InferenceConfig::new()
///     .with_confidence(0.5)
///     .with_iou(0.45)
///     .with_max_detections(100);
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Confidence threshold for detections (0.0 to 1.0).
    /// Detections with confidence scores lower than this value are discarded
    /// before they reach the display.
    pub confidence_threshold: f32,
    /// Intersection over Union (`IoU`) threshold for NMS (0.0 to 1.0).
    pub iou_threshold: f32,
    /// Maximum number of detections to return per frame.
    pub max_detections: usize,
    /// Explicit input image size (height, width).
    /// If `None`, the model's metadata determines the input size.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime. `0` lets the runtime decide.
    pub num_threads: usize,
    /// Hardware device to run inference on. `None` selects the CPU.
    pub device: Option<Device>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            iou_threshold: 0.45,
            max_detections: 300,
            imgsz: None,
            num_threads: 0,
            device: None,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the `IoU` threshold for NMS.
    #[must_use]
    pub const fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set the maximum number of detections to return.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Set the input image size.
    ///
    /// If not set, the model's internal metadata size is used.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of intra-op threads. `0` lets ONNX Runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the hardware device for inference.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = InferenceConfig::default();
        assert!((config.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 300);
        assert!(config.imgsz.is_none());
        assert!(config.device.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = InferenceConfig::new()
            .with_confidence(0.5)
            .with_iou(0.6)
            .with_max_detections(100)
            .with_imgsz(640, 640)
            .with_threads(8)
            .with_device(Device::Cpu);

        assert!((config.confidence_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.iou_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 100);
        assert_eq!(config.imgsz, Some((640, 640)));
        assert_eq!(config.num_threads, 8);
        assert_eq!(config.device, Some(Device::Cpu));
    }
}
