// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Model downloading utilities.
//!
//! Automatically downloads the default YOLO detection model from the
//! Ultralytics GitHub releases when it is not found locally.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Result, ViewerError};

/// Default YOLO detection model name.
pub const DEFAULT_MODEL: &str = "yolo11n.onnx";

/// URL for downloading the default detection model.
const DEFAULT_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.3.0/yolo11n.onnx";

/// Connection timeout in seconds.
const CONNECT_TIMEOUT: u64 = 30;

/// Read timeout in seconds.
const READ_TIMEOUT: u64 = 300;

/// Format bytes as human-readable string (e.g., "10.4MB").
fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.1}GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes / KB)
    } else {
        format!("{bytes:.0}B")
    }
}

/// Format time duration.
fn format_time(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mins = (seconds / 60.0) as u32;
        let secs = seconds % 60.0;
        format!("{mins}:{secs:04.1}")
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let hours = (seconds / 3600.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mins = ((seconds % 3600.0) / 60.0) as u32;
        let secs = seconds % 60.0;
        format!("{hours}:{mins:02}:{secs:04.1}")
    }
}

/// Generate progress bar string.
fn generate_bar(progress: f64, width: usize) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = (progress * width as f64) as usize;
    #[allow(clippy::cast_precision_loss)]
    let partial = progress * width as f64 - filled as f64;

    let mut bar = "━".repeat(filled);
    if filled < width {
        if partial > 0.5 {
            bar.push('╸');
            bar.push_str(&"─".repeat(width - filled - 1));
        } else {
            bar.push_str(&"─".repeat(width - filled));
        }
    }
    bar
}

/// Download a file from URL to the specified path with a progress line.
///
/// Streams to a temporary file, then renames atomically so partial downloads
/// never leave a corrupted destination behind.
fn download_file(url: &str, dest: &Path) -> Result<()> {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
        .timeout_recv_body(Some(Duration::from_secs(READ_TIMEOUT)))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let response = agent.get(url).call().map_err(|e| {
        let msg = match &e {
            ureq::Error::Timeout(_) => format!("Connection timed out while downloading {url}"),
            ureq::Error::Io(io_err) => format!("Network error downloading {url}: {io_err}"),
            _ => format!("Failed to download {url}: {e}"),
        };
        ViewerError::ModelLoadError(msg)
    })?;

    let content_length: Option<u64> = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s: &str| s.parse().ok());

    let total_size = content_length.unwrap_or(0);

    let temp_path = dest.with_extension("part");
    let _ = fs::remove_file(&temp_path);

    let temp_file = File::create(&temp_path).map_err(|e| {
        ViewerError::ModelLoadError(format!(
            "Failed to create temp file {}: {e}",
            temp_path.display()
        ))
    })?;
    let mut writer = BufWriter::new(temp_file);

    let mut reader = response.into_body().into_reader();
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 65536];
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    const BAR_WIDTH: usize = 12;
    const MIN_UPDATE_INTERVAL: f64 = 0.1;

    let desc = format!("Downloading {} to '{}'", url, dest.display());

    let download_result: Result<()> = (|| {
        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|e| {
                ViewerError::ModelLoadError(format!("Failed to read from network: {e}"))
            })?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).map_err(|e| {
                ViewerError::ModelLoadError(format!("Failed to write to temp file: {e}"))
            })?;

            downloaded += bytes_read as u64;

            // Rate-limit progress updates
            let now = Instant::now();
            if now.duration_since(last_update).as_secs_f64() < MIN_UPDATE_INTERVAL {
                continue;
            }
            last_update = now;

            let elapsed = start_time.elapsed().as_secs_f64();
            #[allow(clippy::cast_precision_loss)]
            let rate = if elapsed > 0.0 {
                downloaded as f64 / elapsed
            } else {
                0.0
            };

            #[allow(clippy::cast_precision_loss)]
            if total_size > 0 {
                let progress = (downloaded as f64 / total_size as f64).min(1.0);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let percent = (progress * 100.0) as u8;
                let bar = generate_bar(progress, BAR_WIDTH);

                eprint!(
                    "\r\x1b[K{}: {}% {} {}/{} {}/s {}",
                    desc,
                    percent,
                    bar,
                    format_bytes(downloaded as f64),
                    format_bytes(total_size as f64),
                    format_bytes(rate),
                    format_time(elapsed)
                );
            } else {
                eprint!(
                    "\r\x1b[K{}: {} {}/s {}",
                    desc,
                    format_bytes(downloaded as f64),
                    format_bytes(rate),
                    format_time(elapsed)
                );
            }
            std::io::stderr().flush().ok();
        }

        writer
            .flush()
            .map_err(|e| ViewerError::ModelLoadError(format!("Failed to flush temp file: {e}")))?;

        Ok(())
    })();

    if let Err(e) = download_result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // Final progress line
    let elapsed = start_time.elapsed().as_secs_f64();
    #[allow(clippy::cast_precision_loss)]
    let rate = if elapsed > 0.0 {
        downloaded as f64 / elapsed
    } else {
        0.0
    };

    #[allow(clippy::cast_precision_loss)]
    if total_size > 0 {
        let bar = generate_bar(1.0, BAR_WIDTH);
        eprintln!(
            "\r\x1b[K{}: 100% {} {} {}/s {}",
            desc,
            bar,
            format_bytes(total_size as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    } else {
        eprintln!(
            "\r\x1b[K{}: {} {}/s {}",
            desc,
            format_bytes(downloaded as f64),
            format_bytes(rate),
            format_time(elapsed)
        );
    }

    fs::rename(&temp_path, dest).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ViewerError::ModelLoadError(format!(
            "Failed to move downloaded file to {}: {e}",
            dest.display()
        ))
    })?;

    Ok(())
}

/// Attempt to download a model if it matches a known downloadable model.
///
/// Only `yolo11n.onnx` is auto-downloaded; any other missing model path is a
/// load error.
///
/// # Errors
///
/// Returns an error if the download fails or the model is unknown.
pub fn try_download_model<P: AsRef<Path>>(model_path: P) -> Result<PathBuf> {
    let path = model_path.as_ref();
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if filename != DEFAULT_MODEL {
        return Err(ViewerError::ModelLoadError(format!(
            "Model file not found: {}. Auto-download is only supported for {DEFAULT_MODEL}",
            path.display(),
        )));
    }

    let dest_path = path.to_path_buf();
    download_file(DEFAULT_MODEL_URL, &dest_path)?;

    Ok(dest_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_returns_error() {
        let result = try_download_model("unknown_model.onnx");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Auto-download is only supported"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500.0), "500B");
        assert_eq!(format_bytes(1024.0), "1.0KB");
        assert_eq!(format_bytes(1_048_576.0), "1.0MB");
        assert_eq!(format_bytes(1_073_741_824.0), "1.0GB");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(5.5), "5.5s");
        assert_eq!(format_time(65.0), "1:05.0");
    }

    #[test]
    fn test_generate_bar() {
        assert_eq!(generate_bar(0.0, 10), "──────────");
        assert_eq!(generate_bar(1.0, 10), "━━━━━━━━━━");
        assert_eq!(generate_bar(0.5, 10), "━━━━━─────");
    }
}
