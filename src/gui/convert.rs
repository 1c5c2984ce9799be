// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame-to-texture conversion for display.

use image::DynamicImage;

/// Convert a frame to an `egui` color image for texture upload.
#[must_use]
pub fn color_image_from_frame(frame: &DynamicImage) -> egui::ColorImage {
    let rgb = frame.to_rgb8();
    let size = [rgb.width() as usize, rgb.height() as usize];
    egui::ColorImage::from_rgb(size, rgb.as_raw())
}
