//! Deterministic pattern-library extractor.
//!
//! Always computed: it is the last-resort tier when both model calls fail,
//! a corroborating vote in the batch reconciliation, and a tie-break for
//! name selection. Everything here runs without network access, which is
//! also what makes the merge logic testable offline.
//!
//! The name patterns are an extendable allow-list of products the pharmacy
//! actually stocks, not general NLP - extend [`NAME_PATTERNS`] when a new
//! product family shows up.

use once_cell::sync::Lazy;
use regex::Regex;
use rxscan_core::{CandidateRecord, HintBundle};

use crate::dates;

/// Known product-name shapes, tried in order. First match wins.
pub static NAME_PATTERNS: &[&str] = &[
    r"(?i)\b(cetamol(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(paracetamol(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(amoxicillin(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(azithromycin(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(ibuprofen(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(cetirizine(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(metformin(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(omeprazole(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(pantoprazole(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(salbutamol(?:\s+[\d.]+\s*mg)?)\b",
    r"(?i)\b(amlodipine(?:\s+[\d.]+\s*mg)?)\b",
    r"(?i)\b(ciprofloxacin(?:\s+\d+\s*mg)?)\b",
    r"(?i)\b(jeevan\s*jal)\b",
];

static COMPILED_NAMES: Lazy<Vec<Regex>> = Lazy::new(|| {
    NAME_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

static BATCH_AFTER_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:batch|lot|b)\s*\.?\s*(?:no|number)?\s*\.?\s*[:\-]?\s*([A-Za-z]{1,6}[ -]?\d{3,7})",
    )
    .unwrap()
});

// Pack size patterns, priority order: "N x M TAB", "N TAB x M", lone "N TAB"
static PACK_N_X_M: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*[x×]\s*(\d{1,3})\s*(?:tab|cap)[a-z]*\b").unwrap()
});
static PACK_N_TAB_X_M: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:tab|cap)[a-z]*\.?\s*[x×]\s*(\d{1,3})\b").unwrap()
});
static PACK_LONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,3})\s*(?:tab|cap)[a-z]*\b").unwrap());

static PRICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:mrp|price)\b|मूल्य|मू\.|रु|रू").unwrap());
static AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:,\d{3})*(?:\.\d{1,2})?)").unwrap());
static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(npr|inr|rs)\b|रु|रू|₹").unwrap());

/// Run every pattern family over the OCR text and hint windows.
#[must_use = "extracted candidate is returned but not used"]
pub fn extract(full_text: &str, hints: &HintBundle) -> CandidateRecord {
    let mut record = CandidateRecord {
        name: extract_name(full_text),
        batch_number: extract_batch(full_text),
        ..CandidateRecord::default()
    };

    extract_dates(full_text, hints, &mut record);
    extract_pack_size(full_text, &mut record);
    extract_mrp(full_text, &mut record);
    record
}

fn extract_name(text: &str) -> Option<String> {
    for pattern in COMPILED_NAMES.iter() {
        if let Some(caps) = pattern.captures(text) {
            let name = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
            return Some(name);
        }
    }
    None
}

fn extract_batch(text: &str) -> Option<String> {
    BATCH_AFTER_KEYWORD
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Date selection: hinted windows win outright; otherwise, with two or
/// more full dates in the raw text the first is taken as manufacture and
/// the second as expiry, and a single full date is taken as expiry only.
fn extract_dates(text: &str, hints: &HintBundle, record: &mut CandidateRecord) {
    for window in &hints.mfg {
        if let Some(date) = dates::date_from_window(window, text) {
            record.manufacturing_date = Some(date);
            break;
        }
    }
    for window in &hints.exp {
        if let Some(date) = dates::date_from_window(window, text) {
            record.expiry_date = Some(date);
            break;
        }
    }
    if record.manufacturing_date.is_some() || record.expiry_date.is_some() {
        return;
    }

    let found = dates::find_full_dates(text);
    match found.len() {
        0 => {}
        1 => record.expiry_date = Some(found[0].clone()),
        // No semantic verification here: a license date printed before the
        // expiry will mislabel both. Known limitation of the source data.
        _ => {
            record.manufacturing_date = Some(found[0].clone());
            record.expiry_date = Some(found[1].clone());
        }
    }
}

fn extract_pack_size(text: &str, record: &mut CandidateRecord) {
    if let Some(caps) = PACK_N_X_M.captures(text) {
        record.slips_count = caps[1].parse().ok();
        record.tablets_per_slip = caps[2].parse().ok();
        return;
    }
    if let Some(caps) = PACK_N_TAB_X_M.captures(text) {
        record.tablets_per_slip = caps[1].parse().ok();
        record.slips_count = caps[2].parse().ok();
        return;
    }
    if let Some(caps) = PACK_LONE.captures(text) {
        // slip count unknown for a lone "N TAB"
        record.tablets_per_slip = caps[1].parse().ok();
    }
}

fn extract_mrp(text: &str, record: &mut CandidateRecord) {
    for line in text.lines() {
        if !PRICE_LINE.is_match(line) {
            continue;
        }
        let Some(caps) = AMOUNT.captures(line) else {
            continue;
        };
        let amount: Option<f64> = caps[1].replace(',', "").parse().ok();
        if amount.is_none() {
            continue;
        }
        record.mrp_amount = amount;
        record.mrp_text = Some(line.trim().to_string());
        record.mrp_currency = CURRENCY.find(line).map(|m| {
            match m.as_str().to_lowercase().as_str() {
                "inr" | "₹" => "INR".to_string(),
                // Rs and रु default to NPR on these labels
                _ => "NPR".to_string(),
            }
        });
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::build_hints;

    #[test]
    fn name_allow_list_matches_with_strength() {
        assert_eq!(
            extract_name("blah Paracetamol 500 mg blah").as_deref(),
            Some("Paracetamol 500 mg")
        );
        assert_eq!(extract_name("CETAMOL tablets").as_deref(), Some("CETAMOL"));
        assert!(extract_name("unknown brand").is_none());
    }

    #[test]
    fn batch_after_keyword() {
        assert_eq!(
            extract_batch("Batch No: FBSL 2209 more").as_deref(),
            Some("FBSL 2209")
        );
        assert_eq!(
            extract_batch("LOT AB-1234").as_deref(),
            Some("AB-1234")
        );
        assert!(extract_batch("no marker AB 1234").is_none());
    }

    #[test]
    fn hinted_dates_win_over_positional_heuristic() {
        let text = "Mfg: 2023-05-01\nExp: OCT 24\nprinted 2024";
        let hints = build_hints(text);
        let record = extract(text, &hints);
        assert_eq!(record.manufacturing_date.as_deref(), Some("2023-05-01"));
        assert_eq!(record.expiry_date.as_deref(), Some("2024-10-01"));
    }

    #[test]
    fn two_unhinted_dates_become_mfg_then_exp() {
        let text = "made 01/05/2023 good until 30/04/2025";
        let record = extract(text, &build_hints("no markers"));
        assert_eq!(record.manufacturing_date.as_deref(), Some("2023-05-01"));
        assert_eq!(record.expiry_date.as_deref(), Some("2025-04-30"));
    }

    #[test]
    fn one_unhinted_date_is_expiry_only() {
        let text = "good until 30/04/2025";
        let record = extract(text, &build_hints("no markers"));
        assert!(record.manufacturing_date.is_none());
        assert_eq!(record.expiry_date.as_deref(), Some("2025-04-30"));
    }

    #[test]
    fn pack_size_n_x_m_form() {
        let mut record = CandidateRecord::default();
        extract_pack_size("10 x 10 TABLETS", &mut record);
        assert_eq!(record.slips_count, Some(10));
        assert_eq!(record.tablets_per_slip, Some(10));
    }

    #[test]
    fn pack_size_n_caps_x_m_form() {
        let mut record = CandidateRecord::default();
        extract_pack_size("10 CAPS x 10", &mut record);
        assert_eq!(record.slips_count, Some(10));
        assert_eq!(record.tablets_per_slip, Some(10));
    }

    #[test]
    fn lone_pack_size_leaves_slips_unknown() {
        let mut record = CandidateRecord::default();
        extract_pack_size("30 TABLETS", &mut record);
        assert_eq!(record.slips_count, None);
        assert_eq!(record.tablets_per_slip, Some(30));
    }

    #[test]
    fn mrp_line_with_currency() {
        let mut record = CandidateRecord::default();
        extract_mrp("Cetamol\nMRP Rs. 120.50\n", &mut record);
        assert_eq!(record.mrp_amount, Some(120.50));
        assert_eq!(record.mrp_currency.as_deref(), Some("NPR"));
        assert_eq!(record.mrp_text.as_deref(), Some("MRP Rs. 120.50"));
    }

    #[test]
    fn devanagari_price_line() {
        let mut record = CandidateRecord::default();
        extract_mrp("मूल्य रु 85\n", &mut record);
        assert_eq!(record.mrp_amount, Some(85.0));
        assert_eq!(record.mrp_currency.as_deref(), Some("NPR"));
    }

    #[test]
    fn no_price_keyword_no_mrp() {
        let mut record = CandidateRecord::default();
        extract_mrp("just text 120\n", &mut record);
        assert!(record.mrp_amount.is_none());
        assert!(record.mrp_text.is_none());
    }
}
