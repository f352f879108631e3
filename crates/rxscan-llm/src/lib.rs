//! # rxscan-llm
//!
//! Model-backed extraction tiers for rxscan.
//!
//! Two extractors share one OpenAI-compatible chat client:
//!
//! - [`VisionExtractor`] sends every preprocessed photo (as base64 data
//!   URLs) plus a strict JSON-schema prompt to a vision-capable model.
//!   First attempt, highest trust when it returns a populated record.
//! - [`TextModelExtractor`] sends the combined OCR transcript plus keyword
//!   hints to a text-only model under the same schema. It runs only when
//!   the vision tier was unavailable or insufficient.
//!
//! ## Failure contract
//!
//! Both extractors are tolerant by design: a network error, a timeout, or
//! a malformed response yields `None`, never an error the pipeline has to
//! catch. The fallback chain (vision -> text model -> regex) depends on
//! this.

pub mod client;
pub mod parse;
pub mod schema;
pub mod text;
pub mod vision;

pub use client::{ChatClient, LlmConfig};
pub use text::TextModelExtractor;
pub use vision::VisionExtractor;
