//! Tesseract engine adapter (feature `tesseract`).
//!
//! A `LepTess` worker is created per call and torn down on every exit path
//! by RAII drop, so a panicking or failing recognition never leaks a worker.
//! OCR is a best-effort signal: every internal failure collapses to an
//! empty [`OcrCapture`] instead of propagating, because one unreadable
//! image must not abort the batch.

use leptess::LepTess;
use rxscan_core::OcrCapture;
use tracing::{debug, warn};

use crate::normalize_languages;

/// Per-call Tesseract adapter.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    /// Optional `TESSDATA_PREFIX` override
    datapath: Option<String>,
    /// Canonical `+`-joined language set
    languages: String,
}

impl TesseractEngine {
    /// Create an adapter for the given language list (any separator).
    #[must_use = "engine is created but not used"]
    pub fn new(languages: &str) -> Self {
        Self {
            datapath: None,
            languages: normalize_languages(languages),
        }
    }

    /// Override the tessdata directory (defaults to the system install).
    #[must_use = "builder result is returned but not used"]
    pub fn with_datapath(mut self, datapath: impl Into<String>) -> Self {
        self.datapath = Some(datapath.into());
        self
    }

    /// The canonical language set this adapter recognizes with.
    #[inline]
    #[must_use = "language set is returned but not used"]
    pub fn languages(&self) -> &str {
        &self.languages
    }

    /// Recognize text in one preprocessed image.
    ///
    /// Returns an empty capture on any engine failure; never errors.
    #[must_use = "OCR capture is returned but not used"]
    pub fn recognize(&self, image_bytes: &[u8]) -> OcrCapture {
        // Worker lifecycle is scoped to this call: created here, dropped on
        // every return path below.
        let mut worker = match LepTess::new(self.datapath.as_deref(), &self.languages) {
            Ok(worker) => worker,
            Err(e) => {
                warn!(languages = %self.languages, error = %e, "tesseract init failed");
                return OcrCapture::empty();
            }
        };

        if let Err(e) = worker.set_image_from_mem(image_bytes) {
            warn!(error = %e, "tesseract rejected image buffer");
            return OcrCapture::empty();
        }

        let text = match worker.get_utf8_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "tesseract recognition failed");
                return OcrCapture::empty();
            }
        };

        let confidence = worker.mean_text_conf().clamp(0, 100);
        debug!(
            confidence,
            chars = text.len(),
            languages = %self.languages,
            "tesseract capture complete"
        );
        OcrCapture { text, confidence }
    }
}
