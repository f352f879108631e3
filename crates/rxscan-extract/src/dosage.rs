//! Solid/liquid dosage-form decision and liquid metadata parsing.
//!
//! Liquids need three quantities that OCR loves to conflate: the single
//! dose ("per 5 ml"), the bottle volume ("100 ml"), and the concentration
//! ("125 mg / 5 ml"). The two volume-like numbers are disambiguated by
//! magnitude (doses are small, bottles sit in a 30-500 ml band) and by
//! proximity to quantity keywords. All digit/unit noise repair happens
//! before any pattern runs; the pattern library assumes pre-cleaned text.

use once_cell::sync::Lazy;
use regex::Regex;
use rxscan_core::{DosageForm, LiquidInfo};

/// Upper bound for a plausible single dose, in ml.
const MAX_DOSE_ML: f64 = 20.0;

/// Plausible bottle volume band, in ml.
const BOTTLE_BAND_ML: (f64, f64) = (30.0, 500.0);

static SOLID_KEYWORDS: &[&str] = &["tablet", "tab", "capsule", "cap", "ointment", "cream", "gel"];
static LIQUID_KEYWORDS: &[&str] = &[
    "syrup",
    "suspension",
    "solution",
    "drops",
    "injection",
    "सिरप",
    "झोल",
];

static DOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b (?: per | each | every | प्रति ) \s* (\d{1,2}(?:\.\d+)?) \s* ml \b
        | \b (\d{1,2}(?:\.\d+)?) \s* ml \s* (?: contains | मा )
        ",
    )
    .unwrap()
});

static MULTI_BOTTLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*[x×]\s*(\d{2,3}(?:\.\d+)?)\s*ml\b").unwrap());

static ML_QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{2,3}(?:\.\d+)?)\s*ml\b").unwrap());

static VOLUME_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:net|qty|quantity|vol\w*|contents)\b|परिमाण|मात्रा").unwrap()
});

static CONCENTRATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*mg\s*(?:/|per|प्रति)\s*(5|10)\s*ml").unwrap()
});

/// Repair bilingual digit/unit OCR noise before any pattern matching.
///
/// Covers Devanagari digits, Devanagari ml/mg spellings, the `5my` -> `5 mg`
/// misread, and a letter `O`/`Q` standing in for zero between digits.
#[must_use = "cleaned text is returned but not used"]
pub fn clean_label_numerics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '०'..='९' => out.push(char::from(b'0' + (c as u32 - '०' as u32) as u8)),
            _ => out.push(c),
        }
    }

    // Devanagari unit spellings
    for (from, to) in [
        ("मि.ली.", " ml "),
        ("मि.ली", " ml "),
        ("मि.लि", " ml "),
        ("मिली", " ml "),
        ("एम.एल", " ml "),
        ("एमएल", " ml "),
        ("मि.ग्रा", " mg "),
        ("एमजी", " mg "),
    ] {
        out = out.replace(from, to);
    }

    // "5my" is a recurring misread of "5 mg"
    static MY_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d)\s*my\b").unwrap());
    out = MY_UNIT.replace_all(&out, "$1 mg").to_string();

    // "1O0" -> "100": an O/Q run between digits is a run of zeros
    static O_FOR_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)([OQ]+)(\d)").unwrap());
    loop {
        let repaired = O_FOR_ZERO
            .replace_all(&out, |caps: &regex::Captures| {
                format!("{}{}{}", &caps[1], "0".repeat(caps[2].len()), &caps[3])
            })
            .to_string();
        if repaired == out {
            break;
        }
        out = repaired;
    }

    out
}

/// Decide solid vs. liquid from label text, with an explicit label hint
/// (the model's `dosage_form_on_label`) taking precedence over keyword
/// inference.
#[must_use = "dosage form decision is returned but not used"]
pub fn infer_dosage_form(label_text: &str, label_hint: Option<&str>) -> DosageForm {
    if let Some(hint) = label_hint {
        let hint = hint.to_lowercase();
        if LIQUID_KEYWORDS.iter().any(|k| hint.contains(k)) {
            return DosageForm::Liquid;
        }
        if SOLID_KEYWORDS.iter().any(|k| hint.contains(k)) {
            return DosageForm::Solid;
        }
    }

    let lower = label_text.to_lowercase();
    let liquid_score = LIQUID_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let solid_score = SOLID_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();

    if liquid_score > solid_score {
        DosageForm::Liquid
    } else if solid_score > 0 {
        DosageForm::Solid
    } else {
        DosageForm::Unknown
    }
}

/// Parse liquid metadata from (pre-cleaned) label text.
///
/// The dose is located first so its ml figure can be excluded from the
/// bottle-volume search; a `N x M ml` pack pattern fixes both the bottle
/// count and the volume at once.
#[must_use = "liquid info is returned but not used"]
pub fn parse_liquid(text: &str) -> LiquidInfo {
    let text = clean_label_numerics(text);
    let mut info = LiquidInfo::default();

    if let Some(caps) = DOSE.captures(&text) {
        let dose: Option<f64> = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok());
        info.dose_ml = dose.filter(|&d| d > 0.0 && d <= MAX_DOSE_ML);
    }

    if let Some(caps) = MULTI_BOTTLE.captures(&text) {
        let bottles: Option<u32> = caps[1].parse().ok();
        let volume: Option<f64> = caps[2].parse().ok();
        info.bottles_per_pack = bottles.filter(|&n| n > 1);
        info.bottle_volume_ml = volume.filter(in_bottle_band);
    }

    if info.bottle_volume_ml.is_none() {
        info.bottle_volume_ml = find_bottle_volume(&text, info.dose_ml);
    }

    if let Some(caps) = CONCENTRATION.captures(&text) {
        let mg: Option<f64> = caps[1].parse().ok();
        let per_ml: Option<f64> = caps[2].parse().ok();
        if let (Some(mg), Some(per_ml)) = (mg, per_ml) {
            // canonical basis is mg per 5 ml; a per-10ml reading halves
            let normalized = if (per_ml - 10.0).abs() < f64::EPSILON {
                mg / 2.0
            } else {
                mg
            };
            info.concentration_mg_per_5ml = Some(normalized);
            info.concentration_label = Some(caps[0].trim().to_string());
        }
    }

    info
}

fn in_bottle_band(volume: &f64) -> bool {
    (BOTTLE_BAND_ML.0..=BOTTLE_BAND_ML.1).contains(volume)
}

/// Bottle volume search: prefer ml figures on lines carrying a quantity
/// keyword, then fall back to the first in-band figure anywhere that is
/// not the dose.
fn find_bottle_volume(text: &str, dose_ml: Option<f64>) -> Option<f64> {
    let not_the_dose = |v: &f64| dose_ml.is_none_or(|d| (v - d).abs() > f64::EPSILON);

    for line in text.lines() {
        if !VOLUME_KEYWORD.is_match(line) {
            continue;
        }
        for caps in ML_QUANTITY.captures_iter(line) {
            if let Ok(volume) = caps[1].parse::<f64>() {
                if in_bottle_band(&volume) && not_the_dose(&volume) {
                    return Some(volume);
                }
            }
        }
    }

    for caps in ML_QUANTITY.captures_iter(text) {
        if let Ok(volume) = caps[1].parse::<f64>() {
            if in_bottle_band(&volume) && not_the_dose(&volume) {
                return Some(volume);
            }
        }
    }
    None
}
