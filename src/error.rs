// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the viewer.

use std::fmt;

/// Result type alias for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Main error type for the viewer.
#[derive(Debug)]
pub enum ViewerError {
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Error processing images.
    ImageError(String),
    /// Error parsing model metadata.
    MetadataError(String),
    /// Post-processing error.
    PostProcessingError(String),
    /// Video file processing error.
    VideoError(String),
    /// Camera capture error.
    CameraError(String),
    /// GUI error.
    GuiError(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
    /// Feature not enabled at compile time.
    FeatureNotEnabled(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            Self::PostProcessingError(msg) => write!(f, "Post-processing error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::CameraError(msg) => write!(f, "Camera error: {msg}"),
            Self::GuiError(msg) => write!(f, "GUI error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}
