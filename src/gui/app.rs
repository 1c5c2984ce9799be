// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Application state and event wiring.
//!
//! The window shows the original frame and the annotated frame side-by-side,
//! a panel with the bounding-box coordinates of every detection, and four
//! buttons: Open Image, Open Video, Start Camera, Stop.
//!
//! Everything runs on the UI thread. Video and camera playback is driven by
//! a repeating 30 ms tick: each tick reads one frame from the open capture
//! source, runs detection, and updates both panes. At most one capture
//! source is open at a time.

use std::time::{Duration, Instant};

use egui::{ColorImage, TextureHandle, TextureOptions};
use image::DynamicImage;

use crate::annotate::annotate_image;
use crate::gui::convert::color_image_from_frame;
use crate::gui::dialogs;
use crate::model::DetectionModel;
use crate::source::{FrameMeta, FrameStream, Source};
use crate::verbose;

/// Interval between frame capture ticks.
const FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// The viewer application.
pub struct ViewerApp {
    /// The loaded detection model.
    model: DetectionModel,
    /// Device spec used by the Start Camera button.
    camera_device: String,
    /// The open capture source, if any. `None` while idle.
    stream: Option<FrameStream>,
    /// Source to open on the first update (from the command line).
    pending_source: Option<Source>,
    /// Texture for the original frame pane.
    original_tex: Option<TextureHandle>,
    /// Texture for the annotated frame pane.
    annotated_tex: Option<TextureHandle>,
    /// One text line per displayed detection.
    box_lines: Vec<String>,
    /// Status line under the buttons.
    status: String,
    /// Time of the last playback tick.
    last_tick: Instant,
}

impl ViewerApp {
    /// Create the application.
    ///
    /// # Arguments
    ///
    /// * `model` - The loaded detection model.
    /// * `camera_device` - Device spec for the Start Camera button.
    /// * `initial_source` - Optional source to open on startup.
    #[must_use]
    pub fn new(
        model: DetectionModel,
        camera_device: String,
        initial_source: Option<Source>,
    ) -> Self {
        Self {
            model,
            camera_device,
            stream: None,
            pending_source: initial_source,
            original_tex: None,
            annotated_tex: None,
            box_lines: Vec::new(),
            status: "Select an image, video, or camera".to_string(),
            last_tick: Instant::now(),
        }
    }

    /// Open a source, closing whatever was open before.
    fn open_source(&mut self, ctx: &egui::Context, source: Source) {
        self.stop_media();

        match source {
            Source::Image(path) => match image::open(&path) {
                Ok(img) => self.process_frame(ctx, &img, None),
                Err(_) => {
                    dialogs::show_warning("Read failed", "Could not read the image file");
                }
            },
            Source::Video(path) => match FrameStream::open_video(&path) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.last_tick = Instant::now();
                }
                Err(e) => dialogs::show_warning("Open failed", &e.to_string()),
            },
            Source::Camera(device) => match FrameStream::open_camera(&device) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.last_tick = Instant::now();
                }
                Err(e) => dialogs::show_warning("Camera error", &e.to_string()),
            },
        }
    }

    /// Open Image button: pick a file and show it with detections.
    fn select_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = dialogs::pick_image() {
            self.open_source(ctx, Source::Image(path));
        }
    }

    /// Open Video button: pick a file and start playback.
    fn select_video(&mut self, ctx: &egui::Context) {
        if let Some(path) = dialogs::pick_video() {
            self.open_source(ctx, Source::Video(path));
        }
    }

    /// Start Camera button. No-op if the camera is already live.
    fn start_camera(&mut self, ctx: &egui::Context) {
        if self.stream.as_ref().is_some_and(FrameStream::is_camera) {
            return;
        }
        let device = self.camera_device.clone();
        self.open_source(ctx, Source::Camera(device));
    }

    /// Stop button: release the capture source and restore placeholders.
    fn stop_media(&mut self) {
        self.stream = None;
        self.original_tex = None;
        self.annotated_tex = None;
        self.box_lines.clear();
        self.status = "Select an image, video, or camera".to_string();
    }

    /// One playback tick: read a frame, detect, display.
    fn tick(&mut self, ctx: &egui::Context) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let is_camera = stream.is_camera();

        match stream.next_frame() {
            Some(Ok((frame, meta))) => self.process_frame(ctx, &frame, Some(&meta)),
            Some(Err(e)) => {
                self.stop_media();
                dialogs::show_warning("Capture failed", &e.to_string());
            }
            None => {
                self.stop_media();
                let message = if is_camera {
                    "Camera disconnected"
                } else {
                    "Video playback finished"
                };
                dialogs::show_info("Notice", message);
            }
        }
    }

    /// Run detection on a frame and update both panes.
    fn process_frame(&mut self, ctx: &egui::Context, frame: &DynamicImage, meta: Option<&FrameMeta>) {
        let detections = match self.model.predict_image(frame) {
            Ok(d) => d,
            Err(e) => {
                self.stop_media();
                dialogs::show_warning("Inference failed", &e.to_string());
                return;
            }
        };

        let annotated = annotate_image(frame, &detections);
        let summary = detections.verbose();
        let inference_ms = detections.speed.inference.unwrap_or(0.0);

        if let Some(meta) = meta {
            let total = meta
                .total_frames
                .map_or_else(|| "?".to_string(), |n| n.to_string());
            verbose!(
                "frame {}/{} {}x{}: {}, {:.1}ms",
                meta.frame_idx + 1,
                total,
                frame.width(),
                frame.height(),
                summary,
                inference_ms
            );
        } else {
            verbose!(
                "image {}x{}: {}, {:.1}ms",
                frame.width(),
                frame.height(),
                summary,
                inference_ms
            );
        }

        self.box_lines = detections.box_lines();
        self.status = summary;

        let original_image = color_image_from_frame(frame);
        let annotated_image = color_image_from_frame(&annotated);
        update_texture(ctx, &mut self.original_tex, "original", original_image);
        update_texture(ctx, &mut self.annotated_tex, "annotated", annotated_image);
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(source) = self.pending_source.take() {
            self.open_source(ctx, source);
        }

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui.button("Open Image").clicked() {
                    self.select_image(ctx);
                }
                if ui.button("Open Video").clicked() {
                    self.select_video(ctx);
                }
                if ui.button("Start Camera").clicked() {
                    self.start_camera(ctx);
                }
                if ui.button("Stop").clicked() {
                    self.stop_media();
                }
                ui.separator();
                ui.label(self.status.as_str());
            });
            ui.add_space(6.0);
        });

        egui::SidePanel::right("detections")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Detections");
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.box_lines.is_empty() {
                        ui.weak("No detections");
                    }
                    for line in &self.box_lines {
                        ui.monospace(line.as_str());
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                pane(&mut columns[0], self.original_tex.as_ref(), "Original");
                pane(&mut columns[1], self.annotated_tex.as_ref(), "Detections");
            });
        });

        // Playback timer: one frame per tick while a source is open
        if self.stream.is_some() {
            if self.last_tick.elapsed() >= FRAME_INTERVAL {
                self.last_tick = Instant::now();
                self.tick(ctx);
            }
            ctx.request_repaint_after(FRAME_INTERVAL);
        }
    }
}

/// Render one display pane: the texture if present, otherwise placeholder text.
fn pane(ui: &mut egui::Ui, texture: Option<&TextureHandle>, placeholder: &str) {
    ui.centered_and_justified(|ui| match texture {
        Some(tex) => {
            ui.add(
                egui::Image::new(tex)
                    .max_size(ui.available_size())
                    .maintain_aspect_ratio(true),
            );
        }
        None => {
            ui.label(egui::RichText::new(placeholder).heading().weak());
        }
    });
}

/// Upload a frame into a texture slot, reusing the texture when possible.
fn update_texture(
    ctx: &egui::Context,
    slot: &mut Option<TextureHandle>,
    name: &str,
    image: ColorImage,
) {
    match slot {
        Some(texture) => texture.set(image, TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, image, TextureOptions::LINEAR)),
    }
}
