//! Deterministic image preparation for the OCR and vision tiers.
//!
//! No external calls happen here; for any decodable image both functions
//! always produce output. An undecodable image is the caller's concern and
//! is rejected by the pipeline entry point before extraction starts.

use anyhow::{Context, Result};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Hard luminance cutoff separating ink from background.
const OCR_THRESHOLD: u8 = 140;

/// Histogram tail fraction ignored on each side by the contrast stretch.
const STRETCH_TAIL: f64 = 0.01;

/// Default maximum width for vision uploads.
pub const VISION_MAX_WIDTH: u32 = 1600;

/// Default JPEG quality for vision uploads.
pub const VISION_JPEG_QUALITY: u8 = 80;

/// Normalize an image for Tesseract: grayscale, contrast auto-stretch,
/// sharpen, hard threshold. Returns PNG-encoded bytes.
///
/// # Errors
///
/// Fails only when the input bytes cannot be decoded as an image.
pub fn prepare_for_ocr(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("failed to decode image for OCR")?;
    let gray = img.to_luma8();
    let stretched = stretch_contrast(&gray);
    let sharpened = imageproc::filter::sharpen3x3(&stretched);
    let bw = threshold(&sharpened, OCR_THRESHOLD);

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(bw)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("failed to encode preprocessed image")?;
    Ok(buf)
}

/// Prepare an image for upload to the vision model: auto-rotate per EXIF
/// orientation, downscale to at most `max_width` pixels wide, re-encode as
/// JPEG at `quality`, and wrap as a base64 data URL.
///
/// # Errors
///
/// Fails only when the input bytes cannot be decoded as an image.
pub fn prepare_for_vision(bytes: &[u8], max_width: u32, quality: u8) -> Result<String> {
    let img = image::load_from_memory(bytes).context("failed to decode image for vision")?;
    let img = apply_exif_orientation(img, bytes);

    let (w, h) = (img.width(), img.height());
    let img = if w > max_width {
        // Integer rescale keeps this deterministic across platforms
        let new_h = ((u64::from(h) * u64::from(max_width)) / u64::from(w)).max(1) as u32;
        img.resize_exact(max_width, new_h, FilterType::Triangle)
    } else {
        img
    };

    // JPEG has no alpha channel; flatten to RGB before encoding
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(&rgb)
        .context("failed to encode vision JPEG")?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(format!("data:image/jpeg;base64,{b64}"))
}

/// Linear contrast stretch ignoring the darkest/brightest histogram tails.
fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for Luma([v]) in gray.pixels() {
        histogram[*v as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return gray.clone();
    }

    // Truncation is intended: the tail is a pixel count
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let tail = (total as f64 * STRETCH_TAIL) as u64;

    let mut lo = 0u8;
    let mut acc = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        acc += count;
        if acc > tail {
            lo = value as u8;
            break;
        }
    }
    let mut hi = 255u8;
    acc = 0;
    for (value, &count) in histogram.iter().enumerate().rev() {
        acc += count;
        if acc > tail {
            hi = value as u8;
            break;
        }
    }
    if hi <= lo {
        return gray.clone();
    }

    let span = f64::from(hi) - f64::from(lo);
    let mut out = gray.clone();
    for Luma([v]) in out.pixels_mut() {
        let stretched = (f64::from(*v) - f64::from(lo)) / span * 255.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *v = stretched.clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Binary threshold at a fixed luminance cutoff.
fn threshold(gray: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = gray.clone();
    for Luma([v]) in out.pixels_mut() {
        *v = if *v >= cutoff { 255 } else { 0 };
    }
    out
}

/// Rotate/flip the decoded image according to its EXIF orientation tag.
///
/// Images without EXIF data (or with the identity orientation) pass
/// through untouched.
fn apply_exif_orientation(img: DynamicImage, bytes: &[u8]) -> DynamicImage {
    let Some(orientation) = read_exif_orientation(bytes) else {
        return img;
    };
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn read_exif_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}
