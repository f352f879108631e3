//! # rxscan-extract
//!
//! The deterministic half of the rxscan pipeline: everything that runs
//! without network access.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`hints`] | cut keyword-anchored line windows from the OCR transcript |
//! | [`regex_fallback`] | pattern-library extractor, the always-available last tier |
//! | [`dates`] | canonicalize heterogeneous date tokens to `YYYY-MM-DD` |
//! | [`batch`] | repair noisy batch codes and run the multi-source vote |
//! | [`dosage`] | solid/liquid decision and liquid metadata parsing |
//! | [`merge`] | field-by-field reconciliation of all extraction tiers |
//! | [`enrich`] | ingredient -> uses lookup applied when the models found none |
//!
//! Every function here is pure and independently testable; the pattern
//! libraries can be extended without touching the voting or merge logic.

pub mod batch;
pub mod dates;
pub mod dosage;
pub mod enrich;
pub mod hints;
pub mod merge;
pub mod regex_fallback;

pub use hints::build_hints;
pub use merge::{merge, MergeInput};
pub use regex_fallback::extract as regex_extract;
