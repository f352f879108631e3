//! Field-by-field reconciliation of all extraction tiers.
//!
//! Precedence is positional, not confidence-weighted, and is deliberately
//! spelled out one field at a time so each rule stays auditable:
//!
//! | Field | Rule |
//! |-------|------|
//! | `name` | whichever of model/regex is >= 6 chars, model on tie |
//! | `batch_number` | multi-source vote ([`crate::batch::vote`]) |
//! | dates | hinted label lines > model > regex, all canonicalized |
//! | pack size, MRP | model wherever non-null, else regex |
//! | uses/ingredient/strength/form | model only (+ uses enrichment) |
//! | `total_tablets` | product of both pack fields, or null |

use rxscan_core::{CandidateRecord, DosageForm, HintBundle, MergedRecord, Provenance};
use tracing::debug;

use crate::{batch, dates, dosage, enrich};

/// Minimum length for a name to be considered trustworthy.
const MIN_NAME_LEN: usize = 6;

/// Everything the merge step looks at.
#[derive(Debug)]
pub struct MergeInput<'a> {
    /// Winning model candidate (vision or text tier), if any
    pub model: Option<&'a CandidateRecord>,
    /// The always-computed regex candidate
    pub regex: &'a CandidateRecord,
    /// Keyword windows from the OCR transcript
    pub hints: &'a HintBundle,
    /// Raw per-image OCR text, for the batch sweep and year sniffing
    pub raw_texts: &'a [String],
    /// Tier that won the fallback chain
    pub source: Provenance,
}

/// Reconcile all tiers into the final record.
#[must_use = "merged record is returned but not used"]
pub fn merge(input: &MergeInput<'_>) -> MergedRecord {
    let context = input.raw_texts.join("\n");
    let model = input.model;
    let regex = input.regex;

    let name = pick_name(
        model.and_then(|m| m.name.as_deref()),
        regex.name.as_deref(),
    );

    let batch_number = batch::vote(
        &input.hints.batch,
        input.raw_texts,
        &[
            model.and_then(|m| m.batch_number.as_deref()),
            regex.batch_number.as_deref(),
        ],
    );

    let manufacturing_date = pick_date(
        &input.hints.mfg,
        model.and_then(|m| m.manufacturing_date.as_deref()),
        regex.manufacturing_date.as_deref(),
        &context,
    );
    let expiry_date = pick_date(
        &input.hints.exp,
        model.and_then(|m| m.expiry_date.as_deref()),
        regex.expiry_date.as_deref(),
        &context,
    );

    let slips_count = model.and_then(|m| m.slips_count).or(regex.slips_count);
    let tablets_per_slip = model
        .and_then(|m| m.tablets_per_slip)
        .or(regex.tablets_per_slip);
    let mrp_amount = model.and_then(|m| m.mrp_amount).or(regex.mrp_amount);
    let mrp_currency = model
        .and_then(|m| m.mrp_currency.clone())
        .or_else(|| regex.mrp_currency.clone());
    let mrp_text = model
        .and_then(|m| m.mrp_text.clone())
        .or_else(|| regex.mrp_text.clone());

    // Free-text fields come from the models only; regex does not attempt
    // them. Uses may still be filled from the enrichment table.
    let active_ingredient_on_label = model.and_then(|m| m.active_ingredient_on_label.clone());
    let strength_on_label = model.and_then(|m| m.strength_on_label.clone());
    let dosage_form_on_label = model.and_then(|m| m.dosage_form_on_label.clone());
    let uses_on_label = model
        .and_then(|m| m.uses_on_label.clone())
        .or_else(|| name.as_deref().and_then(enrich::uses_for).map(String::from));

    let total_tablets = match (slips_count, tablets_per_slip) {
        (Some(slips), Some(per_slip)) => slips.checked_mul(per_slip),
        _ => None,
    };

    let form_text = format!(
        "{}\n{}\n{}",
        context,
        name.as_deref().unwrap_or_default(),
        input.hints.lines.join("\n")
    );
    let cleaned = dosage::clean_label_numerics(&form_text);
    let dosage_form = dosage::infer_dosage_form(&cleaned, dosage_form_on_label.as_deref());
    let liquid = match dosage_form {
        DosageForm::Liquid => Some(dosage::parse_liquid(&cleaned)),
        _ => None,
    };

    debug!(
        source = ?input.source,
        has_name = name.is_some(),
        has_batch = batch_number.is_some(),
        ?dosage_form,
        "merge complete"
    );

    MergedRecord {
        record: CandidateRecord {
            name,
            manufacturing_date,
            batch_number,
            expiry_date,
            slips_count,
            tablets_per_slip,
            mrp_amount,
            mrp_currency,
            mrp_text,
            uses_on_label,
            active_ingredient_on_label,
            strength_on_label,
            dosage_form_on_label,
        },
        total_tablets,
        dosage_form,
        liquid,
        source: input.source,
    }
}

/// Prefer whichever name is long enough to be a real product name; the
/// model wins when both qualify, and a short name is still better than
/// nothing.
fn pick_name(model: Option<&str>, regex: Option<&str>) -> Option<String> {
    let long_enough = |s: &&str| s.trim().len() >= MIN_NAME_LEN;
    model
        .filter(long_enough)
        .or_else(|| regex.filter(long_enough))
        .or(model)
        .or(regex)
        .map(|s| s.trim().to_string())
}

/// Date precedence: hinted label lines > model output > regex output.
/// Whatever wins is canonicalized; a source that fails to canonicalize
/// falls through to the next one.
fn pick_date(
    windows: &[String],
    model: Option<&str>,
    regex: Option<&str>,
    context: &str,
) -> Option<String> {
    for window in windows {
        if let Some(date) = dates::date_from_window(window, context) {
            return Some(date);
        }
    }
    if let Some(date) = model.and_then(|token| dates::normalize_date(token, context)) {
        return Some(date);
    }
    regex.and_then(|token| dates::normalize_date(token, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::build_hints;
    use crate::regex_fallback;

    fn merge_simple(
        model: Option<&CandidateRecord>,
        regex: &CandidateRecord,
        source: Provenance,
    ) -> MergedRecord {
        let hints = HintBundle::default();
        merge(&MergeInput {
            model,
            regex,
            hints: &hints,
            raw_texts: &[],
            source,
        })
    }

    #[test]
    fn model_name_wins_tie_when_both_long() {
        let model = CandidateRecord {
            name: Some("Paracetamol 500mg".to_string()),
            ..CandidateRecord::default()
        };
        let regex = CandidateRecord {
            name: Some("Cetamol 500 mg".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &regex, Provenance::Vision);
        assert_eq!(merged.record.name.as_deref(), Some("Paracetamol 500mg"));
    }

    #[test]
    fn short_model_name_loses_to_long_regex_name() {
        let model = CandidateRecord {
            name: Some("Ceta".to_string()),
            ..CandidateRecord::default()
        };
        let regex = CandidateRecord {
            name: Some("Cetamol 500 mg".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &regex, Provenance::Vision);
        assert_eq!(merged.record.name.as_deref(), Some("Cetamol 500 mg"));
    }

    #[test]
    fn short_name_is_still_better_than_nothing() {
        let model = CandidateRecord {
            name: Some("Ceta".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &CandidateRecord::default(), Provenance::Vision);
        assert_eq!(merged.record.name.as_deref(), Some("Ceta"));
    }

    #[test]
    fn hinted_expiry_beats_model_expiry() {
        let text = "Exp: OCT 24\nprinted 2024";
        let hints = build_hints(text);
        let model = CandidateRecord {
            expiry_date: Some("2026-01-01".to_string()),
            ..CandidateRecord::default()
        };
        let raw = vec![text.to_string()];
        let merged = merge(&MergeInput {
            model: Some(&model),
            regex: &CandidateRecord::default(),
            hints: &hints,
            raw_texts: &raw,
            source: Provenance::Vision,
        });
        assert_eq!(merged.record.expiry_date.as_deref(), Some("2024-10-01"));
    }

    #[test]
    fn model_date_is_canonicalized() {
        let model = CandidateRecord {
            expiry_date: Some("April 30, 2025".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &CandidateRecord::default(), Provenance::OcrLlm);
        assert_eq!(merged.record.expiry_date.as_deref(), Some("2025-04-30"));
    }

    #[test]
    fn uncanonicalizable_model_date_falls_to_regex() {
        let model = CandidateRecord {
            expiry_date: Some("sometime soon".to_string()),
            ..CandidateRecord::default()
        };
        let regex = CandidateRecord {
            expiry_date: Some("2025-04-30".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &regex, Provenance::OcrLlm);
        assert_eq!(merged.record.expiry_date.as_deref(), Some("2025-04-30"));
    }

    #[test]
    fn pack_fields_prefer_model_then_regex() {
        let model = CandidateRecord {
            slips_count: Some(10),
            ..CandidateRecord::default()
        };
        let regex = CandidateRecord {
            slips_count: Some(99),
            tablets_per_slip: Some(10),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &regex, Provenance::Vision);
        assert_eq!(merged.record.slips_count, Some(10));
        assert_eq!(merged.record.tablets_per_slip, Some(10));
        assert_eq!(merged.total_tablets, Some(100));
    }

    #[test]
    fn total_tablets_is_never_partially_computed() {
        let regex = CandidateRecord {
            tablets_per_slip: Some(10),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(None, &regex, Provenance::RegexOnly);
        assert_eq!(merged.total_tablets, None);
    }

    #[test]
    fn batch_vote_reconciles_model_and_sweep() {
        let text = "Batch No: FBLSL 2209\nExp: OCT 24";
        let hints = build_hints(text);
        let raw = vec![text.to_string(), "2024 somewhere".to_string()];
        let regex = regex_fallback::extract(text, &hints);
        let merged = merge(&MergeInput {
            model: None,
            regex: &regex,
            hints: &hints,
            raw_texts: &raw,
            source: Provenance::RegexOnly,
        });
        // ligature repaired by normalization before voting
        assert_eq!(merged.record.batch_number.as_deref(), Some("FBSL 2209"));
        assert_eq!(merged.record.expiry_date.as_deref(), Some("2024-10-01"));
    }

    #[test]
    fn uses_enriched_from_resolved_name() {
        let regex = CandidateRecord {
            name: Some("Paracetamol 500 mg".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(None, &regex, Provenance::RegexOnly);
        assert_eq!(
            merged.record.uses_on_label.as_deref(),
            Some("Fever, mild to moderate pain")
        );
    }

    #[test]
    fn model_uses_beat_enrichment() {
        let model = CandidateRecord {
            name: Some("Paracetamol 500 mg".to_string()),
            uses_on_label: Some("As printed on label".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(Some(&model), &CandidateRecord::default(), Provenance::Vision);
        assert_eq!(
            merged.record.uses_on_label.as_deref(),
            Some("As printed on label")
        );
    }

    #[test]
    fn liquid_form_carries_liquid_metadata() {
        let text = "Cough Syrup\nper 5 ml contains 125 mg / 5 ml\nNet: 100 ml";
        let hints = build_hints(text);
        let raw = vec![text.to_string()];
        let merged = merge(&MergeInput {
            model: None,
            regex: &CandidateRecord::default(),
            hints: &hints,
            raw_texts: &raw,
            source: Provenance::RegexOnly,
        });
        assert_eq!(merged.dosage_form, DosageForm::Liquid);
        let liquid = merged.liquid.unwrap();
        assert_eq!(liquid.dose_ml, Some(5.0));
        assert_eq!(liquid.bottle_volume_ml, Some(100.0));
        assert_eq!(liquid.concentration_mg_per_5ml, Some(125.0));
    }

    #[test]
    fn solid_form_has_no_liquid_metadata() {
        let regex = CandidateRecord {
            name: Some("Paracetamol Tablets".to_string()),
            ..CandidateRecord::default()
        };
        let merged = merge_simple(None, &regex, Provenance::RegexOnly);
        assert_eq!(merged.dosage_form, DosageForm::Solid);
        assert!(merged.liquid.is_none());
    }
}
