// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Viewer entry point: parse arguments, load the model, open the window.

use std::path::Path;
use std::process;
use std::str::FromStr;

use clap::Parser;

use ultralytics_viewer::cli::args::Cli;
use ultralytics_viewer::cli::logging;
use ultralytics_viewer::gui::{ViewerApp, dialogs};
use ultralytics_viewer::source::{Source, camera_device};
use ultralytics_viewer::{DetectionModel, Device, InferenceConfig, VERSION, download};
use ultralytics_viewer::{error, verbose};

fn main() {
    let args = Cli::parse();
    logging::set_verbose(args.verbose);

    let device = match args.device.as_deref().map(Device::from_str).transpose() {
        Ok(device) => device,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };

    let mut config = InferenceConfig::new()
        .with_confidence(args.conf)
        .with_iou(args.iou);
    if let Some(size) = args.imgsz {
        config = config.with_imgsz(size, size);
    }
    if let Some(device) = device {
        config = config.with_device(device);
    }

    // Fetch the default model on first launch
    let model_path = Path::new(&args.model);
    if !model_path.exists() {
        if let Err(e) = download::try_download_model(model_path) {
            fatal_model_error(&e.to_string());
        }
    }

    let model = match DetectionModel::load_with_config(&args.model, config) {
        Ok(model) => model,
        Err(e) => fatal_model_error(&e.to_string()),
    };

    let imgsz = model.imgsz();
    verbose!(
        "Ultralytics Viewer {VERSION} 🚀 {}: {} classes, imgsz=({}, {})",
        args.model,
        model.num_classes(),
        imgsz.0,
        imgsz.1
    );

    let initial_source = args.source.as_deref().map(Source::from);
    let camera = camera_device(&args.camera);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 700.0]),
        ..Default::default()
    };

    let app = ViewerApp::new(model, camera, initial_source);
    if let Err(e) = eframe::run_native(
        "Ultralytics Detection Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    ) {
        error!("Failed to start the viewer window: {e}");
        process::exit(1);
    }
}

/// Model loading is fatal: show the dialog the user can see, then exit.
fn fatal_model_error(message: &str) -> ! {
    error!("{message}");
    dialogs::show_error("Model load failed", message);
    process::exit(1);
}
