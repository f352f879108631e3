//! Record types flowing through the extraction pipeline.
//!
//! The central invariant: absence is always an explicit `null`. Every
//! optional field serializes even when empty, so downstream consumers can
//! distinguish "not found" from "found and empty". Do not add
//! `skip_serializing_if` here.

use serde::{Deserialize, Serialize};

/// An input photograph, owned by the caller for the duration of one scan.
///
/// The pipeline never persists image bytes; they are decoded, preprocessed
/// and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Raw encoded image bytes (JPEG, PNG, ...)
    pub bytes: Vec<u8>,
    /// Original filename, used only for logging
    pub filename: String,
    /// Declared content type (e.g. `image/jpeg`)
    pub content_type: String,
}

impl RawImage {
    /// Create a raw image from bytes and metadata.
    #[must_use = "raw image is created but not used"]
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// Raw OCR output for a single image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrCapture {
    /// Recognized text, possibly empty
    pub text: String,
    /// Mean word confidence reported by the engine, 0..=100
    pub confidence: i32,
}

impl OcrCapture {
    /// An empty capture, used when the engine failed or is absent.
    ///
    /// OCR is a best-effort signal; one failed image must not abort the
    /// batch, so failures collapse to this value instead of an error.
    #[inline]
    #[must_use = "empty capture is created but not used"]
    pub const fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0,
        }
    }

    /// Whether the engine produced any text at all.
    #[inline]
    #[must_use = "emptiness check result is returned but not used"]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One extractor's partial, schema-shaped view of the label.
///
/// All three extraction tiers (vision model, text model, regex heuristics)
/// emit this same shape, which is what makes the field-by-field merge in
/// `rxscan-extract` auditable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Product name as printed
    pub name: Option<String>,
    /// Manufacture date, canonical `YYYY-MM-DD` after normalization
    pub manufacturing_date: Option<String>,
    /// Batch/lot code, canonical `LETTERS SPACE DIGITS` after normalization
    pub batch_number: Option<String>,
    /// Expiry date, canonical `YYYY-MM-DD` after normalization
    pub expiry_date: Option<String>,
    /// Number of blister slips in the pack
    pub slips_count: Option<u32>,
    /// Tablets/capsules per slip
    pub tablets_per_slip: Option<u32>,
    /// Numeric maximum retail price
    pub mrp_amount: Option<f64>,
    /// Currency of the MRP (`NPR`, `INR`, ...)
    pub mrp_currency: Option<String>,
    /// The MRP line verbatim
    pub mrp_text: Option<String>,
    /// Uses/indications printed on the label (heuristic, not clinical data)
    pub uses_on_label: Option<String>,
    /// Active ingredient as printed
    pub active_ingredient_on_label: Option<String>,
    /// Strength as printed (e.g. `500 mg`)
    pub strength_on_label: Option<String>,
    /// Dosage form as printed (e.g. `tablet`, `syrup`)
    pub dosage_form_on_label: Option<String>,
}

impl CandidateRecord {
    /// Count fields that are non-null and, for strings, non-empty.
    #[must_use = "populated field count is computed but not used"]
    pub fn populated_fields(&self) -> usize {
        let mut n = 0;
        let mut s = |f: &Option<String>| {
            if f.as_deref().is_some_and(|v| !v.trim().is_empty()) {
                n += 1;
            }
        };
        s(&self.name);
        s(&self.manufacturing_date);
        s(&self.batch_number);
        s(&self.expiry_date);
        s(&self.mrp_currency);
        s(&self.mrp_text);
        s(&self.uses_on_label);
        s(&self.active_ingredient_on_label);
        s(&self.strength_on_label);
        s(&self.dosage_form_on_label);
        n + usize::from(self.slips_count.is_some())
            + usize::from(self.tablets_per_slip.is_some())
            + usize::from(self.mrp_amount.is_some())
    }

    /// Whether any field carries a usable value.
    #[inline]
    #[must_use = "population check result is returned but not used"]
    pub fn is_populated(&self) -> bool {
        self.populated_fields() > 0
    }

    /// Populated fields ignoring `batch_number`.
    ///
    /// The vision tier counts as sufficient only when it read something
    /// beyond a batch-code correction; this is the check backing that rule.
    #[must_use = "populated field count is computed but not used"]
    pub fn populated_fields_beyond_batch(&self) -> usize {
        let mut probe = self.clone();
        probe.batch_number = None;
        probe.populated_fields()
    }
}

/// Which extraction tier ultimately produced the returned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// The vision-capable model read the images directly
    #[serde(rename = "vision")]
    Vision,
    /// The text model read the OCR transcript
    #[serde(rename = "ocr_llm")]
    OcrLlm,
    /// Both model tiers failed; regex heuristics only
    #[serde(rename = "regex-only")]
    RegexOnly,
}

/// Solid vs. liquid handling decision for the package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DosageForm {
    /// Tablets, capsules, and other countable forms
    Solid,
    /// Syrups, suspensions, drops, and other measured forms
    Liquid,
    /// No keyword or label hint matched
    #[default]
    Unknown,
}

/// Liquid-only metadata parsed from the label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidInfo {
    /// Bottle volume in ml, filtered to the plausible 30-500 ml band
    pub bottle_volume_ml: Option<f64>,
    /// Bottle count for `N x M ml` multi-bottle packs
    pub bottles_per_pack: Option<u32>,
    /// Single dose volume in ml (typically <= 20 ml)
    pub dose_ml: Option<f64>,
    /// Concentration normalized to mg per 5 ml
    pub concentration_mg_per_5ml: Option<f64>,
    /// Concentration text verbatim (e.g. `125 mg / 5 ml`)
    pub concentration_label: Option<String>,
}

impl LiquidInfo {
    /// Whether any liquid field was actually found.
    #[must_use = "emptiness check result is returned but not used"]
    pub fn is_empty(&self) -> bool {
        self.bottle_volume_ml.is_none()
            && self.bottles_per_pack.is_none()
            && self.dose_ml.is_none()
            && self.concentration_mg_per_5ml.is_none()
            && self.concentration_label.is_none()
    }
}

/// The reconciled scan result.
///
/// Always returned, even when every extractor came back empty - callers
/// distinguish "nothing found" (mostly-null record, `regex-only` source)
/// from a pipeline error (`ScanError` on caller input only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    /// Reconciled field values
    #[serde(flatten)]
    pub record: CandidateRecord,
    /// `slips_count * tablets_per_slip`, only when both are present
    pub total_tablets: Option<u32>,
    /// Solid vs. liquid decision
    pub dosage_form: DosageForm,
    /// Liquid metadata, present only for liquid forms
    pub liquid: Option<LiquidInfo>,
    /// Which tier produced this record
    #[serde(rename = "_source")]
    pub source: Provenance,
}

impl MergedRecord {
    /// An empty record tagged with the given provenance.
    #[must_use = "merged record is created but not used"]
    pub fn empty(source: Provenance) -> Self {
        Self {
            record: CandidateRecord::default(),
            total_tablets: None,
            dosage_form: DosageForm::Unknown,
            liquid: None,
            source,
        }
    }
}
