// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the viewer library.
//!
//! No test here requires a model file, a display, or camera hardware.

use std::collections::HashMap;

use ndarray::Array2;
use ultralytics_viewer::{
    Boxes, DetectionModel, Detections, InferenceConfig, ModelMetadata, Source, Speed, ViewerError,
};

#[test]
fn test_inference_config_defaults() {
    let config = InferenceConfig::default();
    assert!((config.confidence_threshold - 0.4).abs() < f32::EPSILON);
    assert!((config.iou_threshold - 0.45).abs() < f32::EPSILON);
    assert_eq!(config.max_detections, 300);
}

#[test]
fn test_source_classification_matches_dialog_filters() {
    for ext in ["png", "jpg", "jpeg", "bmp"] {
        assert!(
            Source::from(format!("frame.{ext}")).is_image(),
            "{ext} should classify as image"
        );
    }
    for ext in ["mp4", "avi", "mov", "mkv"] {
        assert!(
            Source::from(format!("clip.{ext}")).is_video(),
            "{ext} should classify as video"
        );
    }
    assert!(Source::from("1").is_camera());
}

#[test]
fn test_detections_text_output() {
    let data = Array2::from_shape_vec(
        (2, 6),
        vec![
            10.0, 20.0, 110.0, 220.0, 0.90, 0.0, // person
            50.0, 60.0, 150.0, 160.0, 0.55, 1.0, // bicycle
        ],
    )
    .unwrap();

    let mut names = HashMap::new();
    names.insert(0, "person".to_string());
    names.insert(1, "bicycle".to_string());

    let detections = Detections::new(
        Boxes::new(data, (480, 640)),
        names,
        Speed::new(1.0, 5.0, 0.5),
        (480, 640),
    );

    assert_eq!(detections.len(), 2);
    assert_eq!(detections.verbose(), "1 person, 1 bicycle");

    let lines = detections.box_lines();
    assert_eq!(lines[0], "person 0.90  (10, 20) - (110, 220)");
    assert_eq!(lines[1], "bicycle 0.55  (50, 60) - (150, 160)");
}

#[test]
fn test_metadata_round_trip() {
    let yaml = "task: detect\nstride: 32\nimgsz: [640, 640]\nnames: {0: 'person', 5: 'bus'}\n";
    let meta = ModelMetadata::from_yaml_str(yaml).unwrap();
    assert!(meta.ensure_detect().is_ok());
    assert_eq!(meta.imgsz, (640, 640));
    assert_eq!(meta.class_name(5), Some("bus"));
}

#[test]
fn test_missing_model_is_load_error() {
    let result = DetectionModel::load("does-not-exist.onnx");
    assert!(matches!(
        result.unwrap_err(),
        ViewerError::ModelLoadError(_)
    ));
}

#[cfg(feature = "camera")]
mod camera {
    use ultralytics_viewer::FrameStream;

    #[test]
    fn test_stub_camera_stream() {
        let mut stream = FrameStream::open_camera("stub://integration").unwrap();
        assert!(stream.is_camera());

        for expected_idx in 0..3 {
            let (frame, meta) = stream.next_frame().unwrap().unwrap();
            assert_eq!(meta.frame_idx, expected_idx);
            assert!(frame.width() > 0 && frame.height() > 0);
        }
    }
}
