// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The desktop application window.

/// Application state and event wiring.
pub mod app;

/// Frame-to-texture conversion.
pub mod convert;

/// Native file and message dialogs.
pub mod dialogs;

pub use app::ViewerApp;
