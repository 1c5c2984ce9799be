// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Capture sources for the viewer.
//!
//! [`Source`] classifies user selections into images, video files, and
//! cameras. [`FrameStream`] is the single open capture handle: video files
//! decode through FFmpeg, cameras capture through V4L2. A `stub://` camera
//! spec selects a synthetic backend so the camera path is testable without
//! hardware.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{Result, ViewerError};

#[cfg(feature = "video")]
use std::sync::Once;

/// Image file extensions accepted by the file dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Video file extensions accepted by the file dialog.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// A frame source selected by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Path to a static image file.
    Image(PathBuf),
    /// Path to a video file.
    Video(PathBuf),
    /// Camera device spec (`/dev/video0`, an index, or `stub://`).
    Camera(String),
}

impl Source {
    /// Check if this source is a static image.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Check if this source is a video file.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// Check if this source is a camera.
    #[must_use]
    pub const fn is_camera(&self) -> bool {
        matches!(self, Self::Camera(_))
    }

    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) | Self::Video(p) => Some(p),
            Self::Camera(_) => None,
        }
    }
}

/// Classify a string into a source.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        // Bare index selects a camera
        if let Ok(idx) = s.parse::<u32>() {
            return Self::Camera(format!("/dev/video{idx}"));
        }

        if s.starts_with("/dev/video") || s.starts_with("stub://") {
            return Self::Camera(s.to_string());
        }

        let path = PathBuf::from(s);
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
                return Self::Video(path);
            }
        }

        // Default to image
        Self::Image(path)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Resolve a camera spec to a device path.
///
/// A bare index maps to `/dev/video<N>`; explicit paths and `stub://` specs
/// pass through untouched.
#[must_use]
pub fn camera_device(spec: &str) -> String {
    match spec.parse::<u32>() {
        Ok(idx) => format!("/dev/video{idx}"),
        Err(_) => spec.to_string(),
    }
}

/// Metadata about a captured frame.
#[derive(Debug, Clone, Default)]
pub struct FrameMeta {
    /// Frame index within the stream.
    pub frame_idx: usize,
    /// Total frames (unknown for cameras).
    pub total_frames: Option<usize>,
    /// Frames per second (for video sources).
    pub fps: Option<f32>,
}

/// The single open capture handle.
///
/// At most one `FrameStream` exists at a time; the GUI drops it on stop,
/// on source change, and at end of stream, which releases the decoder or
/// camera device.
pub enum FrameStream {
    /// Video file decoded with FFmpeg.
    #[cfg(feature = "video")]
    Video(VideoStream),
    /// V4L2 (or synthetic) camera.
    #[cfg(feature = "camera")]
    Camera(CameraStream),
}

impl FrameStream {
    /// Open a video file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the `video` feature
    /// is not enabled.
    #[allow(unused_variables)]
    pub fn open_video(path: &Path) -> Result<Self> {
        #[cfg(feature = "video")]
        {
            Ok(Self::Video(VideoStream::open(path)?))
        }
        #[cfg(not(feature = "video"))]
        {
            Err(ViewerError::FeatureNotEnabled(
                "Video support requires the 'video' feature".to_string(),
            ))
        }
    }

    /// Open a camera device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or the `camera`
    /// feature is not enabled.
    #[allow(unused_variables)]
    pub fn open_camera(device: &str) -> Result<Self> {
        #[cfg(feature = "camera")]
        {
            Ok(Self::Camera(CameraStream::open(device)?))
        }
        #[cfg(not(feature = "camera"))]
        {
            Err(ViewerError::FeatureNotEnabled(
                "Camera support requires the 'camera' feature".to_string(),
            ))
        }
    }

    /// Whether this stream reads from a camera.
    #[must_use]
    pub const fn is_camera(&self) -> bool {
        match self {
            #[cfg(feature = "video")]
            Self::Video(_) => false,
            #[cfg(feature = "camera")]
            Self::Camera(_) => true,
            #[cfg(not(any(feature = "video", feature = "camera")))]
            _ => unreachable!(),
        }
    }

    /// Read the next frame.
    ///
    /// Returns `None` at end of stream (video finished or camera
    /// disconnected).
    pub fn next_frame(&mut self) -> Option<Result<(DynamicImage, FrameMeta)>> {
        match self {
            #[cfg(feature = "video")]
            Self::Video(stream) => stream.next_frame(),
            #[cfg(feature = "camera")]
            Self::Camera(stream) => stream.next_frame(),
            #[cfg(not(any(feature = "video", feature = "camera")))]
            _ => unreachable!(),
        }
    }
}

#[cfg(feature = "video")]
static VIDEO_INIT: Once = Once::new();

/// Initialize `video-rs` once per process.
#[cfg(feature = "video")]
fn init_video() {
    VIDEO_INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            eprintln!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Video file frame stream decoded with FFmpeg.
#[cfg(feature = "video")]
pub struct VideoStream {
    decoder: video_rs::decode::Decoder,
    frame_idx: usize,
    total_frames: Option<usize>,
    fps: f32,
}

#[cfg(feature = "video")]
impl VideoStream {
    /// Open a video file for decoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        init_video();

        let decoder = video_rs::decode::Decoder::new(path)
            .map_err(|e| ViewerError::VideoError(format!("Failed to open video: {e}")))?;

        let fps = decoder.frame_rate();
        // Total frames estimated from duration and frame rate
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_frames = decoder
            .duration()
            .ok()
            .map(|duration| (duration.as_secs_f64() * f64::from(fps)) as usize);

        Ok(Self {
            decoder,
            frame_idx: 0,
            total_frames,
            fps,
        })
    }

    fn next_frame(&mut self) -> Option<Result<(DynamicImage, FrameMeta)>> {
        match self.decoder.decode() {
            Ok((_ts, frame)) => {
                let meta = FrameMeta {
                    frame_idx: self.frame_idx,
                    total_frames: self.total_frames,
                    fps: Some(self.fps),
                };
                self.frame_idx += 1;

                match video_frame_to_image(&frame) {
                    Ok(img) => Some(Ok((img, meta))),
                    Err(e) => Some(Err(e)),
                }
            }
            // Decode errors past the last frame signal end of stream
            Err(_) => None,
        }
    }
}

/// Convert a `video-rs` frame (HWC u8 array) to a `DynamicImage`.
#[cfg(feature = "video")]
fn video_frame_to_image(arr: &video_rs::Frame) -> Result<DynamicImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0])
        .map_err(|_| ViewerError::ImageError("Frame height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(shape[1])
        .map_err(|_| ViewerError::ImageError("Frame width exceeds u32::MAX".to_string()))?;

    let mut rgb_data = Vec::with_capacity((height * width * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            rgb_data.push(arr[[y, x, 0]]);
            rgb_data.push(arr[[y, x, 1]]);
            rgb_data.push(arr[[y, x, 2]]);
        }
    }

    let img_buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
        ViewerError::ImageError("Failed to create image from video frame".to_string())
    })?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

/// Camera frame stream.
///
/// Uses V4L2 for real devices, with a synthetic fallback for `stub://`
/// specs so tests run without hardware.
#[cfg(feature = "camera")]
pub struct CameraStream {
    backend: CameraBackend,
    frame_idx: usize,
}

#[cfg(feature = "camera")]
enum CameraBackend {
    Synthetic(SyntheticCamera),
    Device(Box<DeviceCamera>),
}

#[cfg(feature = "camera")]
impl CameraStream {
    /// Preferred capture width.
    const WIDTH: u32 = 640;
    /// Preferred capture height.
    const HEIGHT: u32 = 480;

    /// Open a camera device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or negotiated to an
    /// RGB format.
    pub fn open(device: &str) -> Result<Self> {
        let backend = if device.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticCamera::new(Self::WIDTH, Self::HEIGHT))
        } else {
            CameraBackend::Device(Box::new(DeviceCamera::open(
                device,
                Self::WIDTH,
                Self::HEIGHT,
            )?))
        };

        Ok(Self {
            backend,
            frame_idx: 0,
        })
    }

    fn next_frame(&mut self) -> Option<Result<(DynamicImage, FrameMeta)>> {
        let frame = match &mut self.backend {
            CameraBackend::Synthetic(camera) => Some(camera.next_frame()),
            // A capture failure on a live device means it disconnected
            CameraBackend::Device(camera) => camera.next_frame(),
        }?;

        let meta = FrameMeta {
            frame_idx: self.frame_idx,
            total_frames: None,
            fps: None,
        };
        self.frame_idx += 1;

        Some(Ok((frame, meta)))
    }
}

/// Synthetic camera producing a moving gradient, for tests and demos.
#[cfg(feature = "camera")]
struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_count: u64,
}

#[cfg(feature = "camera")]
impl SyntheticCamera {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> DynamicImage {
        self.frame_count += 1;

        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *pixel = ((i as u64 + self.frame_count) % 256) as u8;
            }
        }

        let buffer = image::RgbImage::from_raw(self.width, self.height, pixels)
            .expect("buffer length matches dimensions");
        DynamicImage::ImageRgb8(buffer)
    }
}

/// Live V4L2 camera using a memory-mapped buffer stream.
#[cfg(feature = "camera")]
struct DeviceCamera {
    state: DeviceCameraState,
    width: u32,
    height: u32,
}

#[cfg(feature = "camera")]
#[ouroboros::self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "camera")]
impl DeviceCamera {
    fn open(device_path: &str, width: u32, height: u32) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(device_path).map_err(|e| {
            ViewerError::CameraError(format!("Failed to open camera {device_path}: {e}"))
        })?;

        let mut format = device
            .format()
            .map_err(|e| ViewerError::CameraError(format!("Failed to read camera format: {e}")))?;
        format.width = width;
        format.height = height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = device
            .set_format(&format)
            .map_err(|e| ViewerError::CameraError(format!("Failed to set camera format: {e}")))?;

        if format.fourcc != v4l::FourCC::new(b"RGB3") {
            return Err(ViewerError::CameraError(format!(
                "Camera {device_path} does not support RGB capture (got {})",
                format.fourcc
            )));
        }

        let (active_width, active_height) = (format.width, format.height);

        let state = DeviceCameraStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4).map_err(
                    |e| ViewerError::CameraError(format!("Failed to create camera stream: {e}")),
                )
            },
        }
        .try_build()?;

        Ok(Self {
            state,
            width: active_width,
            height: active_height,
        })
    }

    /// Capture the next frame, or `None` if the device disconnected.
    fn next_frame(&mut self) -> Option<DynamicImage> {
        use v4l::io::traits::CaptureStream;

        let expected_len = (self.width * self.height * 3) as usize;
        let pixels = match self.state.with_stream_mut(|stream| {
            stream.next().map(|(buf, _meta)| buf.to_vec())
        }) {
            Ok(buf) => buf,
            Err(_) => return None,
        };

        if pixels.len() < expected_len {
            return None;
        }

        let buffer =
            image::RgbImage::from_raw(self.width, self.height, pixels[..expected_len].to_vec())?;
        Some(DynamicImage::ImageRgb8(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_string() {
        assert!(matches!(Source::from("photo.jpg"), Source::Image(_)));
        assert!(matches!(Source::from("photo.PNG"), Source::Image(_)));
        assert!(matches!(Source::from("clip.mp4"), Source::Video(_)));
        assert!(matches!(Source::from("clip.mkv"), Source::Video(_)));
        assert_eq!(
            Source::from("0"),
            Source::Camera("/dev/video0".to_string())
        );
        assert_eq!(
            Source::from("/dev/video2"),
            Source::Camera("/dev/video2".to_string())
        );
        assert_eq!(
            Source::from("stub://test"),
            Source::Camera("stub://test".to_string())
        );
    }

    #[test]
    fn test_source_checks() {
        let img = Source::Image(PathBuf::from("test.jpg"));
        assert!(img.is_image());
        assert!(!img.is_video());
        assert!(img.path().is_some());

        let vid = Source::Video(PathBuf::from("test.mp4"));
        assert!(vid.is_video());
        assert!(!vid.is_camera());

        let cam = Source::Camera("/dev/video0".to_string());
        assert!(cam.is_camera());
        assert!(cam.path().is_none());
    }

    #[test]
    fn test_camera_device_resolution() {
        assert_eq!(camera_device("0"), "/dev/video0");
        assert_eq!(camera_device("3"), "/dev/video3");
        assert_eq!(camera_device("/dev/video1"), "/dev/video1");
        assert_eq!(camera_device("stub://x"), "stub://x");
    }

    #[cfg(feature = "camera")]
    #[test]
    fn test_stub_camera_produces_frames() {
        let mut stream = FrameStream::open_camera("stub://test").unwrap();
        assert!(stream.is_camera());

        let (frame, meta) = stream.next_frame().unwrap().unwrap();
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(meta.frame_idx, 0);
        assert!(meta.total_frames.is_none());

        let (_, meta) = stream.next_frame().unwrap().unwrap();
        assert_eq!(meta.frame_idx, 1);
    }

    #[cfg(feature = "camera")]
    #[test]
    fn test_stub_camera_frames_change() {
        let mut stream = FrameStream::open_camera("stub://test").unwrap();
        let (frame1, _) = stream.next_frame().unwrap().unwrap();
        let (frame2, _) = stream.next_frame().unwrap().unwrap();
        assert_ne!(frame1.to_rgb8().as_raw(), frame2.to_rgb8().as_raw());
    }
}
