//! Hint builder: keyword-anchored line windows from the OCR transcript.
//!
//! Labels print their structured values next to a small set of markers
//! ("Mfg. Date", "Exp", "Batch No.", "MRP", and their Devanagari
//! equivalents). Pulling the matching line plus its next neighbor gives
//! the model prompts and the regex searches a much denser signal than the
//! full transcript.

use once_cell::sync::Lazy;
use regex::Regex;
use rxscan_core::hints::MAX_HINTS_PER_FAMILY;
use rxscan_core::HintBundle;

static MFG_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mfg|mfd|manufactur\w*)\b|उत्पादन|निर्माण").unwrap()
});
static EXP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:exp\w*|use\s+before|best\s+before)\b|म्याद|समाप्ति").unwrap()
});
static BATCH_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:batch|lot)\b|\bb\.?\s*no\b|ब्याच").unwrap());
static PRICE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mrp|price|npr|inr|rs)\b|मूल्य|मू\.|रु|रू").unwrap()
});
static LICENSE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:lic\w*|regd?|reg\.?\s*no|dda)\b|अनुमति|इजाजत").unwrap()
});

/// Build the hint bundle from concatenated OCR text.
///
/// Pure, no I/O, O(lines x keyword-families). Each family is
/// deduplicated, order-preserving, and capped at
/// [`MAX_HINTS_PER_FAMILY`] windows.
#[must_use = "hint bundle is built but not used"]
pub fn build_hints(text: &str) -> HintBundle {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    HintBundle {
        mfg: collect_windows(&lines, &MFG_MARKER),
        exp: collect_windows(&lines, &EXP_MARKER),
        batch: collect_windows(&lines, &BATCH_MARKER),
        price: collect_windows(&lines, &PRICE_MARKER),
        license: collect_windows(&lines, &LICENSE_MARKER),
        lines,
    }
}

/// Windows for one keyword family: the matching line joined with its next
/// neighbor (label values frequently wrap onto the following line).
fn collect_windows(lines: &[String], marker: &Regex) -> Vec<String> {
    let mut windows = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !marker.is_match(line) {
            continue;
        }
        let mut window = line.clone();
        if let Some(next) = lines.get(i + 1) {
            window.push(' ');
            window.push_str(next);
        }
        if !windows.contains(&window) {
            windows.push(window);
        }
        if windows.len() == MAX_HINTS_PER_FAMILY {
            break;
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_batch_and_expiry_windows() {
        let text = "Cetamol 500\nBatch No: FBSL 2209\nExp: OCT 24\nMRP Rs. 120";
        let bundle = build_hints(text);
        assert_eq!(bundle.batch, vec!["Batch No: FBSL 2209 Exp: OCT 24"]);
        assert_eq!(bundle.exp, vec!["Exp: OCT 24 MRP Rs. 120"]);
        assert_eq!(bundle.price, vec!["MRP Rs. 120"]);
        assert!(bundle.mfg.is_empty());
        assert_eq!(bundle.lines.len(), 4);
    }

    #[test]
    fn devanagari_markers_match() {
        let text = "म्याद सकिने: २०२४\nमूल्य रु. १२०";
        let bundle = build_hints(text);
        assert_eq!(bundle.exp.len(), 1);
        assert_eq!(bundle.price.len(), 1);
    }

    #[test]
    fn windows_are_deduplicated_and_capped() {
        let mut text = String::new();
        for _ in 0..3 {
            text.push_str("Batch No: AB 1234\n");
        }
        for i in 0..20 {
            text.push_str(&format!("lot {i}\n"));
        }
        let bundle = build_hints(&text);
        assert_eq!(bundle.batch.len(), MAX_HINTS_PER_FAMILY);
        // the three identical lines collapse to a single identical window
        assert_eq!(
            bundle
                .batch
                .iter()
                .filter(|w| w.as_str() == "Batch No: AB 1234 Batch No: AB 1234")
                .count(),
            1
        );
    }

    #[test]
    fn last_line_window_has_no_neighbor() {
        let bundle = build_hints("plain text\nExp 10/2024");
        assert_eq!(bundle.exp, vec!["Exp 10/2024"]);
    }

    #[test]
    fn rs_inside_words_is_not_a_price_marker() {
        let bundle = build_hints("universal powders\nno price here");
        assert!(bundle.price.is_empty());
    }
}
