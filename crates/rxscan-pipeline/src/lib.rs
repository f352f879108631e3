//! # rxscan-pipeline
//!
//! The scan orchestrator: a pure function from a batch of photographs to
//! one [`MergedRecord`], built from capability traits so every stage can
//! be faked in tests.
//!
//! ```text
//! images ──► preprocess ──► OCR (per image, concurrent) ──► hints
//!                 │                                           │
//!                 ▼                                           ▼
//!          vision tier ──insufficient──► text tier      regex tier (always)
//!                 │                          │                │
//!                 └──────────┬───────────────┴────────────────┘
//!                            ▼
//!                   merge & voting ──► MergedRecord + provenance
//! ```
//!
//! The fallback policy is an explicit state machine, not nested error
//! handling: each tier returns an `Option`, the orchestrator short-circuits
//! on the first sufficient result, and a total miss still produces a
//! `regex-only` record. The only errors surfaced to the caller are input
//! violations (image count, undecodable image).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rxscan_core::error::{MAX_IMAGES, MIN_IMAGES};
use rxscan_core::{CandidateRecord, HintBundle, MergedRecord, OcrCapture, Provenance, RawImage, ScanError};
use rxscan_extract::{build_hints, merge, regex_extract, MergeInput};
use rxscan_ocr::preprocess;
use tracing::{info, warn};

/// Vision-capable model tier: reads the photographs directly.
#[async_trait]
pub trait VisionExtract: Send + Sync {
    /// Extract from prepared data-URL images; `None` means unavailable.
    async fn extract(&self, image_data_urls: &[String]) -> Option<CandidateRecord>;
}

/// Text model tier: reads the OCR transcript.
#[async_trait]
pub trait TextExtract: Send + Sync {
    /// Extract from OCR text and hints; `None` means unavailable.
    async fn extract(&self, ocr_text: &str, hints: &HintBundle) -> Option<CandidateRecord>;
}

/// Blocking OCR engine; one call per image, run on the blocking pool.
pub trait OcrSource: Send + Sync {
    /// Recognize text in one preprocessed image. Never errors: failures
    /// collapse to an empty capture.
    fn recognize(&self, image_bytes: &[u8]) -> OcrCapture;
}

/// OCR stand-in used when no engine is linked in. The fallback chain
/// tolerates the empty signal (the vision tier does not need OCR).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOcr;

impl OcrSource for NullOcr {
    fn recognize(&self, _image_bytes: &[u8]) -> OcrCapture {
        OcrCapture::empty()
    }
}

#[cfg(feature = "tesseract")]
impl OcrSource for rxscan_ocr::TesseractEngine {
    fn recognize(&self, image_bytes: &[u8]) -> OcrCapture {
        Self::recognize(self, image_bytes)
    }
}

#[async_trait]
impl VisionExtract for rxscan_llm::VisionExtractor {
    async fn extract(&self, image_data_urls: &[String]) -> Option<CandidateRecord> {
        Self::extract(self, image_data_urls).await
    }
}

#[async_trait]
impl TextExtract for rxscan_llm::TextModelExtractor {
    async fn extract(&self, ocr_text: &str, hints: &HintBundle) -> Option<CandidateRecord> {
        Self::extract(self, ocr_text, hints).await
    }
}

/// Stage-level knobs. The outer tier timeouts are a hard backstop on top
/// of the HTTP client's own timeout so a misbehaving transport can never
/// hang a scan.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum width for vision uploads, in pixels
    pub vision_max_width: u32,
    /// JPEG quality for vision uploads
    pub vision_jpeg_quality: u8,
    /// Outer timeout on the vision tier
    pub vision_timeout: Duration,
    /// Outer timeout on the text tier
    pub text_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vision_max_width: preprocess::VISION_MAX_WIDTH,
            vision_jpeg_quality: preprocess::VISION_JPEG_QUALITY,
            vision_timeout: Duration::from_secs(75),
            text_timeout: Duration::from_secs(60),
        }
    }
}

/// The scan orchestrator.
pub struct Pipeline {
    vision: Arc<dyn VisionExtract>,
    text: Arc<dyn TextExtract>,
    ocr: Arc<dyn OcrSource>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Assemble a pipeline from its three capabilities.
    #[must_use = "pipeline is created but not used"]
    pub fn new(
        vision: Arc<dyn VisionExtract>,
        text: Arc<dyn TextExtract>,
        ocr: Arc<dyn OcrSource>,
    ) -> Self {
        Self {
            vision,
            text,
            ocr,
            config: PipelineConfig::default(),
        }
    }

    /// Replace the default stage configuration.
    #[must_use = "builder result is returned but not used"]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one scan over 2-20 photographs of a single package.
    ///
    /// # Errors
    ///
    /// Only caller input violations error: a bad image count or an
    /// undecodable image. Every extraction failure degrades through the
    /// vision -> text-model -> regex chain instead.
    pub async fn scan(&self, images: &[RawImage]) -> Result<MergedRecord, ScanError> {
        if images.len() < MIN_IMAGES || images.len() > MAX_IMAGES {
            return Err(ScanError::ImageCount(images.len()));
        }

        let (data_urls, captures) = self.preprocess_and_recognize(images).await?;
        let raw_texts: Vec<String> = captures.iter().map(|c| c.text.clone()).collect();
        let combined = raw_texts.join("\n");
        let hints = build_hints(&combined);
        // Cheap and deterministic, so it is always computed: last-resort
        // candidate, batch-vote corroborator, and name tie-break.
        let regex_candidate = regex_extract(&combined, &hints);

        let (model, source) = self.run_fallback_chain(&data_urls, &combined, &hints).await;
        info!(source = ?source, "extraction chain settled");

        Ok(merge(&MergeInput {
            model: model.as_ref(),
            regex: &regex_candidate,
            hints: &hints,
            raw_texts: &raw_texts,
            source,
        }))
    }

    /// Per-image preprocessing and OCR, concurrently on the blocking pool.
    async fn preprocess_and_recognize(
        &self,
        images: &[RawImage],
    ) -> Result<(Vec<String>, Vec<OcrCapture>), ScanError> {
        let tasks: Vec<_> = images
            .iter()
            .map(|image| {
                let bytes = image.bytes.clone();
                let filename = image.filename.clone();
                let ocr = Arc::clone(&self.ocr);
                let max_width = self.config.vision_max_width;
                let quality = self.config.vision_jpeg_quality;
                tokio::task::spawn_blocking(move || {
                    let data_url = preprocess::prepare_for_vision(&bytes, max_width, quality)
                        .map_err(|e| ScanError::UndecodableImage {
                            filename: filename.clone(),
                            reason: e.to_string(),
                        })?;
                    let ocr_png =
                        preprocess::prepare_for_ocr(&bytes).map_err(|e| ScanError::UndecodableImage {
                            filename: filename.clone(),
                            reason: e.to_string(),
                        })?;
                    let capture = ocr.recognize(&ocr_png);
                    Ok::<(String, OcrCapture), ScanError>((data_url, capture))
                })
            })
            .collect();

        let mut data_urls = Vec::with_capacity(images.len());
        let mut captures = Vec::with_capacity(images.len());
        for task in futures::future::join_all(tasks).await {
            // A panicked worker is an empty OCR signal, not a failed scan;
            // the engine itself already collapses its own errors.
            match task {
                Ok(Ok((url, capture))) => {
                    data_urls.push(url);
                    captures.push(capture);
                }
                Ok(Err(input_error)) => return Err(input_error),
                Err(join_error) => {
                    warn!(error = %join_error, "image worker panicked");
                    captures.push(OcrCapture::empty());
                }
            }
        }
        Ok((data_urls, captures))
    }

    /// The vision -> text-model fallback state machine.
    async fn run_fallback_chain(
        &self,
        data_urls: &[String],
        combined: &str,
        hints: &HintBundle,
    ) -> (Option<CandidateRecord>, Provenance) {
        let vision_result = match tokio::time::timeout(
            self.config.vision_timeout,
            self.vision.extract(data_urls),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("vision tier exceeded its timeout");
                None
            }
        };

        let vision_batch = vision_result
            .as_ref()
            .and_then(|record| record.batch_number.clone());
        if let Some(record) = vision_result {
            if record.populated_fields_beyond_batch() > 0 {
                return (Some(record), Provenance::Vision);
            }
            info!("vision tier returned nothing beyond a batch correction");
        }

        let text_result = match tokio::time::timeout(
            self.config.text_timeout,
            self.text.extract(combined, hints),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("text tier exceeded its timeout");
                None
            }
        };

        if let Some(mut record) = text_result {
            if record.is_populated() {
                // An insufficient vision pass may still have corrected the
                // batch code; keep that evidence for the vote.
                if record.batch_number.is_none() {
                    record.batch_number = vision_batch;
                }
                return (Some(record), Provenance::OcrLlm);
            }
        }

        match vision_batch {
            // All we ever got was the vision batch correction; let it vote.
            Some(batch) => (
                Some(CandidateRecord {
                    batch_number: Some(batch),
                    ..CandidateRecord::default()
                }),
                Provenance::RegexOnly,
            ),
            None => (None, Provenance::RegexOnly),
        }
    }
}
