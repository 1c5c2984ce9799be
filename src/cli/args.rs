// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use crate::download::DEFAULT_MODEL;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"Examples:
    ultralytics-viewer
    ultralytics-viewer --model best.onnx --conf 0.5
    ultralytics-viewer --camera 1 --verbose
    ultralytics-viewer traffic.mp4
    ultralytics-viewer --device cuda:0 photo.jpg"#)]
pub struct Cli {
    /// Path to ONNX detection model file
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.4)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = 0.45)]
    pub iou: f32,

    /// Inference image size (overrides model metadata)
    #[arg(long)]
    pub imgsz: Option<usize>,

    /// Device to use (cpu, cuda:0, coreml, directml:0, openvino, tensorrt:0)
    #[arg(long)]
    pub device: Option<String>,

    /// Camera used by the Start Camera button (index or device path)
    #[arg(long, default_value = "0")]
    pub camera: String,

    /// Image or video file to open on startup
    pub source: Option<String>,

    /// Show per-frame output on stdout
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_args_defaults() {
        let args = Cli::parse_from(["app"]);
        assert_eq!(args.model, DEFAULT_MODEL);
        assert!((args.conf - 0.4).abs() < f32::EPSILON);
        assert!((args.iou - 0.45).abs() < f32::EPSILON);
        assert_eq!(args.camera, "0");
        assert!(args.source.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_custom() {
        let args = Cli::parse_from([
            "app",
            "--model",
            "custom.onnx",
            "--conf",
            "0.8",
            "--camera",
            "/dev/video2",
            "--verbose",
            "clip.mp4",
        ]);
        assert_eq!(args.model, "custom.onnx");
        assert!((args.conf - 0.8).abs() < f32::EPSILON);
        assert_eq!(args.camera, "/dev/video2");
        assert_eq!(args.source, Some("clip.mp4".to_string()));
        assert!(args.verbose);
    }
}
