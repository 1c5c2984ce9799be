// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for detection inference.
//!
//! Performs letterbox resizing to the model input size (gray padding,
//! centered), normalization to [0, 1], and conversion to an NCHW f32 tensor.
//! The scale and padding applied here are carried in [`PreprocessResult`] so
//! post-processing can project box coordinates back to the original image.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use ndarray::{Array3, Array4};

use crate::error::{Result, ViewerError};

/// Letterbox padding color (Ultralytics gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Letterbox padding value normalized to [0, 1].
const LETTERBOX_NORM: f32 = 114.0 / 255.0;

/// Normalization factor.
const INV_255: f32 = 1.0 / 255.0;

/// Result of preprocessing an image.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// NCHW f32 tensor, shape (1, 3, height, width), values in [0, 1].
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

/// Calculate letterbox dimensions for an image.
///
/// Returns `(new_width, new_height, pad_left, pad_top, scale)` where `scale`
/// is the uniform resize ratio applied to both axes.
#[must_use]
pub fn letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (usize, usize),
) -> (u32, u32, u32, u32, f32) {
    let (target_h, target_w) = target_size;

    #[allow(clippy::cast_precision_loss)]
    let scale = (target_h as f32 / orig_height as f32).min(target_w as f32 / orig_width as f32);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let new_width = ((orig_width as f32 * scale).round() as u32).min(target_w as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let new_height = ((orig_height as f32 * scale).round() as u32).min(target_h as u32).max(1);

    #[allow(clippy::cast_possible_truncation)]
    let pad_left = (target_w as u32 - new_width) / 2;
    #[allow(clippy::cast_possible_truncation)]
    let pad_top = (target_h as u32 - new_height) / 2;

    (new_width, new_height, pad_left, pad_top, scale)
}

/// Preprocess an image for detection inference.
///
/// # Arguments
///
/// * `image` - Input image.
/// * `target_size` - Model input size as (height, width).
///
/// # Errors
///
/// Returns an error if the resize buffers cannot be created.
pub fn preprocess_image(
    image: &DynamicImage,
    target_size: (usize, usize),
) -> Result<PreprocessResult> {
    let rgb = image.to_rgb8();
    let (orig_width, orig_height) = rgb.dimensions();
    let orig_shape = (orig_height, orig_width);

    let (new_width, new_height, pad_left, pad_top, scale) =
        letterbox_params(orig_width, orig_height, target_size);

    // Bilinear resize to the letterbox content area
    let src_image = Image::from_vec_u8(orig_width, orig_height, rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| ViewerError::ImageError(format!("Failed to create resize source: {e}")))?;
    let mut dst_image = Image::new(new_width, new_height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| ViewerError::ImageError(format!("Failed to resize image: {e}")))?;

    // Paste the resized content into a gray letterbox canvas, normalized NCHW
    let (target_h, target_w) = target_size;
    let mut tensor = Array4::<f32>::from_elem((1, 3, target_h, target_w), LETTERBOX_NORM);

    let buf = dst_image.buffer();
    let (pad_top_us, pad_left_us) = (pad_top as usize, pad_left as usize);
    for y in 0..new_height as usize {
        let row = y * new_width as usize * 3;
        for x in 0..new_width as usize {
            let idx = row + x * 3;
            let (ty, tx) = (y + pad_top_us, x + pad_left_us);
            tensor[[0, 0, ty, tx]] = f32::from(buf[idx]) * INV_255;
            tensor[[0, 1, ty, tx]] = f32::from(buf[idx + 1]) * INV_255;
            tensor[[0, 2, ty, tx]] = f32::from(buf[idx + 2]) * INV_255;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    Ok(PreprocessResult {
        tensor,
        orig_shape,
        scale: (scale, scale),
        padding: (pad_top as f32, pad_left as f32),
    })
}

/// Convert a `DynamicImage` to an HWC u8 array.
#[must_use]
pub fn image_to_array(image: &DynamicImage) -> Array3<u8> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let raw = rgb.into_raw();

    Array3::from_shape_vec((height as usize, width as usize, 3), raw)
        .expect("RGB buffer length matches dimensions")
}

/// Project box coordinates from letterbox space back to original image space.
///
/// # Arguments
///
/// * `coords` - [x1, y1, x2, y2] in letterbox coordinates.
/// * `scale` - Scale factors (`scale_y`, `scale_x`) from preprocessing.
/// * `padding` - Padding (`pad_top`, `pad_left`) from preprocessing.
#[must_use]
pub fn scale_coords(coords: &[f32; 4], scale: (f32, f32), padding: (f32, f32)) -> [f32; 4] {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    [
        (coords[0] - pad_left) / scale_x,
        (coords[1] - pad_top) / scale_y,
        (coords[2] - pad_left) / scale_x,
        (coords[3] - pad_top) / scale_y,
    ]
}

/// Clip box coordinates to image bounds.
///
/// # Arguments
///
/// * `coords` - [x1, y1, x2, y2].
/// * `shape` - Image shape as (height, width).
#[must_use]
pub const fn clip_coords(coords: &[f32; 4], shape: (u32, u32)) -> [f32; 4] {
    #[allow(clippy::cast_precision_loss)]
    let (max_y, max_x) = (shape.0 as f32, shape.1 as f32);
    [
        coords[0].clamp(0.0, max_x),
        coords[1].clamp(0.0, max_y),
        coords[2].clamp(0.0, max_x),
        coords[3].clamp(0.0, max_y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_params_wide_image() {
        // 1280x720 into 640x640: scale 0.5, content 640x360, vertical padding
        let (new_w, new_h, pad_left, pad_top, scale) = letterbox_params(1280, 720, (640, 640));
        assert_eq!(new_w, 640);
        assert_eq!(new_h, 360);
        assert_eq!(pad_left, 0);
        assert_eq!(pad_top, 140);
        assert!((scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_letterbox_params_square() {
        let (new_w, new_h, pad_left, pad_top, _) = letterbox_params(640, 640, (640, 640));
        assert_eq!((new_w, new_h), (640, 640));
        assert_eq!((pad_left, pad_top), (0, 0));
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            100,
            50,
            image::Rgb([255, 0, 0]),
        ));
        let result = preprocess_image(&img, (64, 64)).unwrap();
        assert_eq!(result.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(result.orig_shape, (50, 100));

        // Top rows are padding
        assert!((result.tensor[[0, 0, 0, 0]] - LETTERBOX_NORM).abs() < 1e-6);
        // Center is red content
        assert!(result.tensor[[0, 0, 32, 32]] > 0.9);
        assert!(result.tensor[[0, 1, 32, 32]] < 0.1);
    }

    #[test]
    fn test_scale_coords_round_trip() {
        let scale = (0.5, 0.5);
        let padding = (140.0, 0.0);
        // A box at letterbox (100, 200, 300, 400) maps to original coordinates
        let scaled = scale_coords(&[100.0, 200.0, 300.0, 400.0], scale, padding);
        assert_eq!(scaled, [200.0, 120.0, 600.0, 520.0]);
    }

    #[test]
    fn test_clip_coords() {
        let clipped = clip_coords(&[-5.0, 10.0, 700.0, 400.0], (480, 640));
        assert_eq!(clipped, [0.0, 10.0, 640.0, 400.0]);
    }

    #[test]
    fn test_image_to_array() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3])));
        let arr = image_to_array(&img);
        assert_eq!(arr.shape(), &[2, 3, 3]);
        assert_eq!(arr[[1, 2, 1]], 2);
    }
}
