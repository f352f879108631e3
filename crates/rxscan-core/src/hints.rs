//! Keyword-anchored line windows cut from the OCR transcript.
//!
//! The hint builder in `rxscan-extract` scans the concatenated OCR text for
//! label keywords (batch, expiry, manufacture, price, license) and captures
//! the matching line plus its immediate neighbors. The resulting bundle is a
//! read-only view used to bias the model prompts and the regex searches.

use serde::{Deserialize, Serialize};

/// Maximum hint windows retained per keyword family.
pub const MAX_HINTS_PER_FAMILY: usize = 10;

/// Separator used when joining hint windows into a prompt block.
pub const HINT_SEPARATOR: &str = " | ";

/// Named line-windows per keyword family plus the full split line list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintBundle {
    /// Lines around manufacture-date markers
    pub mfg: Vec<String>,
    /// Lines around expiry-date markers
    pub exp: Vec<String>,
    /// Lines around batch/lot markers
    pub batch: Vec<String>,
    /// Lines around price/MRP markers
    pub price: Vec<String>,
    /// Lines around license markers
    pub license: Vec<String>,
    /// Every line of the source text, in order
    pub lines: Vec<String>,
}

impl HintBundle {
    /// Whether any keyword family matched at all.
    #[must_use = "emptiness check result is returned but not used"]
    pub fn is_empty(&self) -> bool {
        self.mfg.is_empty()
            && self.exp.is_empty()
            && self.batch.is_empty()
            && self.price.is_empty()
            && self.license.is_empty()
    }

    /// Join one family's windows for prompt embedding.
    #[inline]
    #[must_use = "joined hint block is returned but not used"]
    pub fn join(family: &[String]) -> String {
        family.join(HINT_SEPARATOR)
    }

    /// Render the whole bundle as a compact block for a model prompt.
    ///
    /// Families with no matches are omitted; an empty bundle renders as an
    /// empty string.
    #[must_use = "prompt block is returned but not used"]
    pub fn prompt_block(&self) -> String {
        let mut out = String::new();
        for (label, family) in [
            ("MFG HINTS", &self.mfg),
            ("EXP HINTS", &self.exp),
            ("BATCH HINTS", &self.batch),
            ("PRICE HINTS", &self.price),
            ("LICENSE HINTS", &self.license),
        ] {
            if !family.is_empty() {
                out.push_str(label);
                out.push_str(": ");
                out.push_str(&Self::join(family));
                out.push('\n');
            }
        }
        out
    }
}
