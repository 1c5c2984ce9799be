// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Native file and message dialogs.

use std::path::PathBuf;

use crate::source::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Open a file dialog filtered to supported image files.
#[must_use]
pub fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open Image")
        .add_filter("Image Files", IMAGE_EXTENSIONS)
        .pick_file()
}

/// Open a file dialog filtered to supported video files.
#[must_use]
pub fn pick_video() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open Video")
        .add_filter("Video Files", VIDEO_EXTENSIONS)
        .pick_file()
}

/// Show a modal information dialog.
pub fn show_info(title: &str, message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Info)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Show a modal warning dialog.
pub fn show_warning(title: &str, message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Show a modal error dialog.
pub fn show_error(title: &str, message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
