// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame annotation: bounding boxes and labels.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::results::Detections;

/// Assets URL for downloading fonts.
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Label font file name.
const LABEL_FONT: &str = "Arial.ttf";

/// Box line thickness in pixels.
const BOX_THICKNESS: i32 = 3;

/// Ultralytics Color Palette
pub const COLORS: [[u8; 3]; 20] = [
    [4, 42, 255],    // #042aff
    [11, 219, 235],  // #0bdbeb
    [243, 243, 243], // #f3f3f3
    [0, 223, 183],   // #00dfb7
    [17, 31, 104],   // #111f68
    [255, 111, 221], // #ff6fdd
    [255, 68, 79],   // #ff444f
    [204, 237, 0],   // #cced00
    [0, 243, 68],    // #00f344
    [189, 0, 255],   // #bd00ff
    [0, 180, 255],   // #00b4ff
    [221, 0, 186],   // #dd00ba
    [0, 255, 255],   // #00ffff
    [38, 192, 0],    // #26c000
    [1, 255, 179],   // #01ffb3
    [125, 36, 255],  // #7d24ff
    [123, 0, 104],   // #7b0068
    [255, 27, 108],  // #ff1b6c
    [252, 109, 47],  // #fc6d2f
    [162, 255, 11],  // #a2ff0b
];

/// Get the palette color for a class ID.
#[must_use]
pub fn get_class_color(class_id: usize) -> Rgb<u8> {
    let color = COLORS[class_id % COLORS.len()];
    Rgb(color)
}

/// Check if the label font exists locally, downloading it on first use.
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join("Ultralytics");
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        eprintln!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    eprintln!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Failed to create font file: {e}");
                    return None;
                }
            };

            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                eprintln!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }

            Some(font_path)
        }
        Err(e) => {
            eprintln!("Failed to download font from {url}: {e}");
            None
        }
    }
}

/// Font bytes, fetched once per process. `None` if the font is unavailable;
/// boxes then render without labels.
fn font_data() -> Option<&'static [u8]> {
    static FONT_DATA: OnceLock<Option<Vec<u8>>> = OnceLock::new();

    FONT_DATA
        .get_or_init(|| {
            let path = check_font(LABEL_FONT)?;
            let mut file = File::open(path).ok()?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer).ok()?;
            Some(buffer)
        })
        .as_deref()
}

/// Annotate a frame with detection boxes and labels.
///
/// Returns a new image; the input frame is left untouched so the original
/// pane can keep displaying it.
#[must_use]
pub fn annotate_image(image: &DynamicImage, detections: &Detections) -> DynamicImage {
    let mut img = image.to_rgb8();
    let (width, height) = img.dimensions();

    let font = font_data().and_then(|data| FontRef::try_from_slice(data).ok());

    let xyxy = detections.boxes.xyxy();
    let conf = detections.boxes.conf();
    let cls = detections.boxes.cls();

    for i in 0..detections.len() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let class_id = cls[i] as usize;
        let confidence = conf[i];

        #[allow(clippy::cast_possible_truncation)]
        let (mut x1, mut y1, mut x2, mut y2) = (
            xyxy[[i, 0]].round() as i32,
            xyxy[[i, 1]].round() as i32,
            xyxy[[i, 2]].round() as i32,
            xyxy[[i, 3]].round() as i32,
        );

        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }

        // Clamp to image bounds
        #[allow(clippy::cast_possible_wrap)]
        let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);
        x1 = x1.clamp(0, max_x);
        y1 = y1.clamp(0, max_y);
        x2 = x2.clamp(0, max_x);
        y2 = y2.clamp(0, max_y);

        // Skip degenerate boxes
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let color = get_class_color(class_id);

        for t in 0..BOX_THICKNESS {
            let tx1 = (x1 + t).min(x2);
            let ty1 = (y1 + t).min(y2);
            let tx2 = (x2 - t).max(tx1);
            let ty2 = (y2 - t).max(ty1);
            if tx2 > tx1 && ty2 > ty1 {
                #[allow(clippy::cast_sign_loss)]
                let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
                draw_hollow_rect_mut(&mut img, rect, color);
            }
        }

        let label = format!("{} {:.2}", detections.class_name(i), confidence);

        if let Some(ref f) = font {
            let scale = PxScale::from(16.0);
            // Position text above the box if there's room, otherwise below
            let text_y = if y1 > 20 { y1 - 20 } else { y2 + 5 };
            let text_x = x1.max(0);
            #[allow(clippy::cast_possible_wrap)]
            if text_y >= 0 && text_x < width as i32 && text_y < height as i32 {
                draw_text_mut(&mut img, color, text_x, text_y, scale, f, &label);
            }
        }
    }

    DynamicImage::ImageRgb8(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Boxes, Speed};
    use ndarray::Array2;
    use std::collections::HashMap;

    fn sample_detections() -> Detections {
        let data =
            Array2::from_shape_vec((1, 6), vec![10.0, 10.0, 60.0, 60.0, 0.9, 0.0]).unwrap();
        let mut names = HashMap::new();
        names.insert(0, "person".to_string());
        Detections::new(
            Boxes::new(data, (100, 100)),
            names,
            Speed::default(),
            (100, 100),
        )
    }

    #[test]
    fn test_class_color_wraps() {
        assert_eq!(get_class_color(0), get_class_color(COLORS.len()));
    }

    #[test]
    fn test_annotate_draws_box() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            100,
            100,
            image::Rgb([0, 0, 0]),
        ));
        let annotated = annotate_image(&img, &sample_detections());
        let rgb = annotated.to_rgb8();

        // A box edge pixel picked up the class color
        let expected = get_class_color(0);
        assert_eq!(rgb.get_pixel(10, 10), &expected);
        // A pixel well inside the box stays untouched
        assert_eq!(rgb.get_pixel(35, 35), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_empty_detections_is_noop() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            20,
            20,
            image::Rgb([7, 7, 7]),
        ));
        let empty = Detections::new(
            Boxes::empty((20, 20)),
            HashMap::new(),
            Speed::default(),
            (20, 20),
        );
        let annotated = annotate_image(&img, &empty);
        assert_eq!(annotated.to_rgb8().get_pixel(5, 5), &image::Rgb([7, 7, 7]));
    }
}
