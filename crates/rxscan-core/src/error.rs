//! Caller-facing error taxonomy.
//!
//! The pipeline recovers from every transient source failure internally
//! (model timeout, OCR crash, malformed JSON) by falling through to the
//! next tier, so the only errors it surfaces are caller input violations.

use thiserror::Error;

/// Minimum number of images per scan.
pub const MIN_IMAGES: usize = 2;

/// Maximum number of images per scan.
pub const MAX_IMAGES: usize = 20;

/// Errors a scan can surface to the caller.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Fewer than [`MIN_IMAGES`] or more than [`MAX_IMAGES`] images supplied
    #[error("expected {MIN_IMAGES}-{MAX_IMAGES} images, got {0}")]
    ImageCount(usize),

    /// An input image could not be decoded at all
    #[error("image '{filename}' could not be decoded: {reason}")]
    UndecodableImage {
        /// Offending input filename
        filename: String,
        /// Decoder error text
        reason: String,
    },
}
