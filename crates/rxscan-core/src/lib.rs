//! # rxscan-core
//!
//! Shared data model for the rxscan medicine-label extraction pipeline.
//!
//! A scan takes a small batch of photographs of one medicine package and
//! produces a single [`MergedRecord`]: the best-effort reconciliation of
//! whatever the vision model, the OCR text model, and the deterministic
//! regex heuristics could read off the label.
//!
//! ## Types
//!
//! - [`RawImage`] - caller-owned image bytes entering the pipeline
//! - [`OcrCapture`] - raw text + confidence for one image
//! - [`HintBundle`] - keyword-anchored line windows cut from the OCR text
//! - [`CandidateRecord`] - one extractor's partial view of the label
//! - [`MergedRecord`] - the reconciled result, tagged with [`Provenance`]
//! - [`ScanError`] - the (small) set of caller-facing failures
//!
//! Everything here is plain data. Extraction logic lives in `rxscan-extract`,
//! model transport in `rxscan-llm`, imaging in `rxscan-ocr`, and the
//! orchestration state machine in `rxscan-pipeline`.

pub mod error;
pub mod hints;
pub mod record;

pub use error::ScanError;
pub use hints::HintBundle;
pub use record::{
    CandidateRecord, DosageForm, LiquidInfo, MergedRecord, OcrCapture, Provenance, RawImage,
};
