//! Raster work on rendered page images.

use crate::domain::ports::CommandRunner;
use crate::tools::ocr::detect_rotation;
use crate::utils::error::Result;
use crate::utils::fs::{list_files_with_ext, reset_dir};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageReader};
use std::path::{Path, PathBuf};

pub const THUMBNAIL_WIDTH: u32 = 200;
pub const MIN_REMAINING_AREA: f64 = 0.2;

/// Applies a clockwise rotation as reported by Tesseract OSD.
pub fn rotate_clockwise(img: DynamicImage, degrees: u32) -> DynamicImage {
    match degrees % 360 {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    }
}

/// Rotates every image upright in place. Returns whether any file changed.
pub async fn correct_orientation<R: CommandRunner + ?Sized>(
    runner: &R,
    tesseract: &str,
    files: &[PathBuf],
) -> Result<bool> {
    let mut rotated = false;
    for file in files {
        let angle = match detect_rotation(runner, tesseract, file).await {
            Ok(angle) => angle,
            Err(e) => {
                tracing::warn!("Orientation detection failed for {}: {}", file.display(), e);
                continue;
            }
        };
        if angle % 360 == 0 {
            continue;
        }
        tracing::debug!("Rotating {} by {} degrees", file.display(), angle);
        let img = image::open(file)?;
        rotate_clockwise(img, angle).save(file)?;
        rotated = true;
    }
    Ok(rotated)
}

fn row_mean(gray: &GrayImage, y: u32, x0: u32, x1: u32) -> f64 {
    let sum: u64 = (x0..x1).map(|x| u64::from(gray.get_pixel(x, y)[0])).sum();
    sum as f64 / f64::from((x1 - x0).max(1))
}

fn column_mean(gray: &GrayImage, x: u32, y0: u32, y1: u32) -> f64 {
    let sum: u64 = (y0..y1).map(|y| u64::from(gray.get_pixel(x, y)[0])).sum();
    sum as f64 / f64::from((y1 - y0).max(1))
}

/// Bounding box `(x, y, width, height)` left after peeling dark rows and
/// columns off each edge. `None` when nothing is dark.
pub fn dark_border_bounds(gray: &GrayImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let threshold = f64::from(threshold);
    let (mut top, mut bottom) = (0, height);
    let (mut left, mut right) = (0, width);

    while top < bottom && row_mean(gray, top, left, right) < threshold {
        top += 1;
    }
    while bottom > top && row_mean(gray, bottom - 1, left, right) < threshold {
        bottom -= 1;
    }
    while left < right && column_mean(gray, left, top, bottom) < threshold {
        left += 1;
    }
    while right > left && column_mean(gray, right - 1, top, bottom) < threshold {
        right -= 1;
    }

    if (left, top, right, bottom) == (0, 0, width, height) {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

/// Crops dark scanner background from the edges of each image in place.
/// Returns how many images were cropped.
pub fn crop_dark_background(files: &[PathBuf], threshold: u8) -> Result<usize> {
    let mut cropped = 0;
    for file in files {
        let img = image::open(file)?;
        let Some((x, y, w, h)) = dark_border_bounds(&img.to_luma8(), threshold) else {
            continue;
        };
        let area = f64::from(img.width()) * f64::from(img.height());
        if (f64::from(w) * f64::from(h)) / area < MIN_REMAINING_AREA {
            tracing::warn!("Skipping background crop of {}: too little page left", file.display());
            continue;
        }
        img.crop_imm(x, y, w, h).save(file)?;
        cropped += 1;
    }
    Ok(cropped)
}

/// Decodes any supported raster (PNM included) by content and writes a PNG.
pub fn convert_to_png(src: &Path, dst: &Path) -> Result<()> {
    let img = ImageReader::open(src)?.with_guessed_format()?.decode()?;
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(dst, image::ImageFormat::Png)?;
    Ok(())
}

pub fn export_thumbnails(images_dir: &Path, thumbs_dir: &Path, width: u32) -> Result<Vec<PathBuf>> {
    reset_dir(thumbs_dir)?;
    let mut thumbs = Vec::new();
    for file in list_files_with_ext(images_dir, "png")? {
        let img = image::open(&file)?;
        let height = ((u64::from(img.height()) * u64::from(width)) / u64::from(img.width().max(1))).max(1) as u32;
        let thumb = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();
        let target = thumbs_dir.join(file.with_extension("jpg").file_name().unwrap_or_default());
        thumb.save_with_format(&target, image::ImageFormat::Jpeg)?;
        thumbs.push(target);
    }
    Ok(thumbs)
}
