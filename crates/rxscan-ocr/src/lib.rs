//! Imaging front-end for rxscan: OCR normalization and the Tesseract adapter.
//!
//! # Architecture
//!
//! Two independent preparations are made from each input photograph:
//!
//! 1. **OCR normalization** ([`preprocess::prepare_for_ocr`]): grayscale,
//!    contrast stretch, sharpen, hard luminance threshold. Tesseract reads
//!    label text far better from this binarized rendition than from the
//!    original photo.
//! 2. **Vision transport** ([`preprocess::prepare_for_vision`]): EXIF
//!    auto-rotation, downscale, JPEG re-encode, base64 data URL. This is
//!    what gets uploaded to the vision model.
//!
//! # Feature flags
//!
//! The Tesseract engine links against native libraries, so it is gated
//! behind the `tesseract` feature (off by default). Without it this crate
//! still provides preprocessing; the pipeline degrades to an empty OCR
//! signal, which the fallback chain tolerates.

pub mod preprocess;

#[cfg(feature = "tesseract")]
pub mod engine;

#[cfg(feature = "tesseract")]
pub use engine::TesseractEngine;

/// Default Tesseract language set for bilingual (Latin + Devanagari) labels.
pub const DEFAULT_LANGUAGES: &str = "eng+nep";

/// Normalize a language list into Tesseract's canonical `+`-joined form.
///
/// Accepts comma-, space-, or plus-separated input; duplicates are dropped
/// while preserving first-seen order. Empty input falls back to
/// [`DEFAULT_LANGUAGES`].
#[must_use = "normalized language set is returned but not used"]
pub fn normalize_languages(input: &str) -> String {
    let mut seen = Vec::new();
    for token in input.split(|c: char| c == ',' || c == '+' || c.is_whitespace()) {
        let token = token.trim();
        if !token.is_empty() && !seen.iter().any(|s| s == token) {
            seen.push(token.to_string());
        }
    }
    if seen.is_empty() {
        DEFAULT_LANGUAGES.to_string()
    } else {
        seen.join("+")
    }
}
