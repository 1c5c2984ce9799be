// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface for launching the viewer.

// Modules
/// CLI arguments.
pub mod args;

/// Logging macros and verbosity control.
pub mod logging;
