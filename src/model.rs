// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection model loading and inference.
//!
//! [`DetectionModel`] wraps an ONNX Runtime session. The model is consumed as
//! a black box: given a preprocessed image tensor it returns a raw prediction
//! tensor, which post-processing decodes into bounding boxes.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::TensorRef;

use crate::error::{Result, ViewerError};
use crate::inference::InferenceConfig;
use crate::metadata::ModelMetadata;
use crate::postprocessing::decode_detections;
use crate::preprocessing::preprocess_image;
use crate::results::{Detections, Speed};

/// Object-detection model backed by an ONNX Runtime session.
///
/// # Example
///
/// ```no_run
/// use ultralytics_viewer::DetectionModel;
///
/// let mut model = DetectionModel::load("yolo11n.onnx")?;
/// let img = image::open("frame.jpg")?;
/// let detections = model.predict_image(&img)?;
/// println!("{}", detections.verbose());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DetectionModel {
    /// ONNX Runtime session.
    session: Session,
    /// Model metadata (class names, input size, stride).
    metadata: ModelMetadata,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: Vec<String>,
    /// Inference configuration.
    config: InferenceConfig,
    /// Whether the model has been warmed up.
    warmed_up: bool,
}

impl DetectionModel {
    /// Load a detection model from an ONNX file with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist, can't be loaded, or
    /// is not a detection model.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, InferenceConfig::default())
    }

    /// Load a detection model with custom configuration.
    ///
    /// The model metadata (class names, input size) is extracted from the
    /// ONNX model's custom metadata properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist, can't be loaded, or
    /// is not a detection model.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ViewerError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let builder = Session::builder().map_err(|e| {
            ViewerError::ModelLoadError(format!("Failed to create session builder: {e}"))
        })?;

        let builder = register_execution_providers(builder, &config)?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                ViewerError::ModelLoadError(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(config.num_threads)
            .map_err(|e| {
                ViewerError::ModelLoadError(format!("Failed to set intra-thread count: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| ViewerError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let metadata = Self::extract_metadata(&session)?;
        metadata.ensure_detect()?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        // Model metadata fills in the input size unless overridden
        let config = InferenceConfig {
            imgsz: config.imgsz.or(Some(metadata.imgsz)),
            ..config
        };

        Ok(Self {
            session,
            metadata,
            input_name,
            output_names,
            config,
            warmed_up: false,
        })
    }

    /// Warm up the model by running inference on a dummy input.
    ///
    /// Pre-allocates memory and optimizes the execution graph. Called
    /// automatically on first predict.
    ///
    /// # Errors
    ///
    /// Returns an error if the warmup inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let target_size = self.config.imgsz.unwrap_or(self.metadata.imgsz);
        let dummy_input = Array4::<f32>::zeros((1, 3, target_size.0, target_size.1));
        let _ = self.run_inference(&dummy_input)?;

        self.warmed_up = true;
        Ok(())
    }

    /// Extract metadata from the ONNX model session.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session.metadata().map_err(|e| {
            ViewerError::ModelLoadError(format!("Failed to get model metadata: {e}"))
        })?;

        // Ultralytics stores metadata under individual keys
        let mut metadata_map: HashMap<String, String> = HashMap::new();

        let keys = [
            "description", "author", "date", "version", "license", "docs",
            "stride", "task", "batch", "imgsz", "names", "channels",
        ];

        for key in &keys {
            if let Ok(Some(value)) = model_metadata.custom(key) {
                metadata_map.insert((*key).to_string(), value);
            }
        }

        // Build a combined YAML string from the individual keys
        if !metadata_map.is_empty() {
            let mut yaml_parts = Vec::new();
            for (key, value) in &metadata_map {
                yaml_parts.push(format!("{key}: {value}"));
            }
            let combined_yaml = yaml_parts.join("\n");
            let mut combined_map = HashMap::new();
            combined_map.insert(String::new(), combined_yaml);
            return ModelMetadata::from_onnx_metadata(&combined_map);
        }

        // Also try a single combined key
        for key in &["", "metadata", "model_metadata"] {
            if let Ok(Some(value)) = model_metadata.custom(key) {
                metadata_map.insert((*key).to_string(), value);
            }
        }

        ModelMetadata::from_onnx_metadata(&metadata_map)
    }

    /// Run detection on a frame.
    ///
    /// Letterboxes the frame to the model input size, runs the session, and
    /// decodes the output into confidence-filtered boxes in original frame
    /// coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn predict_image(&mut self, image: &DynamicImage) -> Result<Detections> {
        if !self.warmed_up {
            self.warmup()?;
        }

        let target_size = self.config.imgsz.unwrap_or(self.metadata.imgsz);

        let start_preprocess = Instant::now();
        let preprocess_result = preprocess_image(image, target_size)?;
        let preprocess_time = start_preprocess.elapsed().as_secs_f64() * 1000.0;

        let start_inference = Instant::now();
        let (output_data, output_shape) = self.run_inference(&preprocess_result.tensor)?;
        let inference_time = start_inference.elapsed().as_secs_f64() * 1000.0;

        let start_postprocess = Instant::now();
        let boxes = decode_detections(
            &output_data,
            &output_shape,
            &preprocess_result,
            &self.config,
            self.metadata.num_classes(),
        );
        let postprocess_time = start_postprocess.elapsed().as_secs_f64() * 1000.0;

        let speed = Speed::new(preprocess_time, inference_time, postprocess_time);

        Ok(Detections::new(
            boxes,
            self.metadata.names.clone(),
            speed,
            preprocess_result.orig_shape,
        ))
    }

    /// Run the ONNX model session.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, Vec<usize>)> {
        // Ensure input is contiguous in memory
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            ViewerError::InferenceError(format!("Failed to create input tensor: {e}"))
        })?;

        let inputs = ort::inputs![&self.input_name => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| ViewerError::InferenceError(format!("Inference failed: {e}")))?;

        let output_name = &self.output_names[0];
        let output = outputs.get(output_name.as_str()).ok_or_else(|| {
            ViewerError::InferenceError(format!("Output '{output_name}' not found"))
        })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ViewerError::InferenceError(format!("Failed to extract output: {e}")))?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let data_vec: Vec<f32> = data.to_vec();

        Ok((data_vec, shape_vec))
    }

    /// Get the model's class names.
    #[must_use]
    pub fn names(&self) -> &HashMap<usize, String> {
        &self.metadata.names
    }

    /// Get the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.metadata.num_classes()
    }

    /// Get the model's input size as (height, width).
    #[must_use]
    pub fn imgsz(&self) -> (usize, usize) {
        self.config.imgsz.unwrap_or(self.metadata.imgsz)
    }

    /// Get the model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Get the active inference configuration.
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

impl std::fmt::Debug for DetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionModel")
            .field("num_classes", &self.metadata.num_classes())
            .field("imgsz", &self.metadata.imgsz)
            .field("stride", &self.metadata.stride)
            .finish()
    }
}

/// Register hardware execution providers selected by the configuration.
///
/// Each provider is only available when the matching cargo feature is
/// enabled; requesting a provider that was not compiled in is an error.
#[allow(unused_mut, unused_variables, clippy::unnecessary_wraps)]
fn register_execution_providers(
    mut builder: SessionBuilder,
    config: &InferenceConfig,
) -> Result<SessionBuilder> {
    use crate::device::Device;

    let Some(device) = &config.device else {
        return Ok(builder);
    };

    match device {
        Device::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        Device::Cuda(index) => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(*index as i32)
                    .build()])
                .map_err(|e| {
                    ViewerError::ModelLoadError(format!("Failed to register CUDA EP: {e}"))
                })
        }
        #[cfg(feature = "tensorrt")]
        Device::TensorRt(index) => {
            use ort::execution_providers::TensorRTExecutionProvider;
            builder
                .with_execution_providers([TensorRTExecutionProvider::default()
                    .with_device_id(*index as i32)
                    .build()])
                .map_err(|e| {
                    ViewerError::ModelLoadError(format!("Failed to register TensorRT EP: {e}"))
                })
        }
        #[cfg(feature = "coreml")]
        Device::CoreMl => {
            use ort::execution_providers::CoreMLExecutionProvider;
            builder
                .with_execution_providers([CoreMLExecutionProvider::default()
                    .with_subgraphs(true)
                    .build()])
                .map_err(|e| {
                    ViewerError::ModelLoadError(format!("Failed to register CoreML EP: {e}"))
                })
        }
        #[cfg(feature = "directml")]
        Device::DirectMl(index) => {
            use ort::execution_providers::DirectMLExecutionProvider;
            builder
                .with_execution_providers([DirectMLExecutionProvider::default()
                    .with_device_id(*index as i32)
                    .build()])
                .map_err(|e| {
                    ViewerError::ModelLoadError(format!("Failed to register DirectML EP: {e}"))
                })
        }
        #[cfg(feature = "openvino")]
        Device::OpenVino => {
            use ort::execution_providers::OpenVINOExecutionProvider;
            builder
                .with_execution_providers([OpenVINOExecutionProvider::default().build()])
                .map_err(|e| {
                    ViewerError::ModelLoadError(format!("Failed to register OpenVINO EP: {e}"))
                })
        }
        #[allow(unreachable_patterns)]
        other => Err(ViewerError::ModelLoadError(format!(
            "Device '{other}' requires a cargo feature that was not compiled in"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = DetectionModel::load("nonexistent.onnx");
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ViewerError::ModelLoadError(_)
        ));
    }
}
