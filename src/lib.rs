// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! # Ultralytics YOLO Detection Viewer
//!
//! Desktop application that loads a pre-trained YOLO detection model and shows
//! the original frame and the annotated frame side-by-side, together with the
//! bounding-box coordinates of every detection as text.
//!
//! Frames come from one of three sources, selected with the buttons at the
//! bottom of the window:
//!
//! - **Open Image** - a single `.png`/`.jpg`/`.jpeg`/`.bmp` file
//! - **Open Video** - a `.mp4`/`.avi`/`.mov`/`.mkv` file decoded with FFmpeg
//! - **Start Camera** - a V4L2 device, polled on a 30 ms timer
//!
//! All computer-vision work is delegated to the ONNX model through
//! ONNX Runtime; the application itself only wires UI events, drives the
//! frame timer, and converts frames for display.
//!
//! ## Usage
//!
//! ```bash
//! # Launch with the default model (auto-downloads yolo11n.onnx)
//! ultralytics-viewer
//!
//! # Custom model and thresholds
//! ultralytics-viewer --model best.onnx --conf 0.5
//!
//! # Open a video immediately and use the second camera for the camera button
//! ultralytics-viewer --camera 1 traffic.mp4
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`model`] | [`DetectionModel`] wrapping an ONNX Runtime session |
//! | [`results`] | Output types ([`Detections`], [`Boxes`], [`Speed`]) |
//! | [`inference`] | [`InferenceConfig`] for thresholds and input sizing |
//! | [`source`] | Capture sources ([`Source`], [`FrameStream`]) |
//! | [`annotate`] | Box and label drawing on frames |
//! | [`gui`] | The `eframe` application window |
//! | [`error`] | Error types ([`ViewerError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `video` | Video file playback via FFmpeg (default) |
//! | `camera` | V4L2 camera capture (default) |
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `tensorrt` | NVIDIA `TensorRT` optimization |
//! | `coreml` | Apple `CoreML` (macOS) |
//! | `directml` | `DirectML` (Windows) |
//! | `openvino` | Intel `OpenVINO` |

// Modules
pub mod annotate;
pub mod cli;
pub mod device;
pub mod download;
pub mod error;
pub mod gui;
pub mod inference;
pub mod metadata;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
pub mod source;
pub mod utils;

// Re-export main types for convenience
pub use device::Device;
pub use error::{Result, ViewerError};
pub use inference::InferenceConfig;
pub use metadata::ModelMetadata;
pub use model::DetectionModel;
pub use results::{Boxes, Detections, Speed};
pub use source::{FrameMeta, FrameStream, Source};

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "ultralytics-viewer");
    }
}
