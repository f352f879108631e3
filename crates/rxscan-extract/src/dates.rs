//! Date token normalization to canonical `YYYY-MM-DD`.
//!
//! Label dates arrive in every shape OCR can produce: year-first or
//! day-first numerics with `/`, `-` or `.` separators, month names with or
//! without a day, two-digit years, and bare "OCT 24" partials. Everything
//! normalizes to `YYYY-MM-DD`; normalization is idempotent.

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Two-digit years at or above this pivot are 19xx, below are 20xx.
const CENTURY_PIVOT: u32 = 70;

static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$").unwrap());
static DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{2,4})$").unwrap());
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$").unwrap()
});
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]{3,9})\.?,?\s*[-]?\s*(\d{4})$").unwrap());
static MONTH_PARTIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]{3,9})\.?,?\s*[-]?\s*(\d{1,2})$").unwrap());
static CONTEXT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// Spans that look like dates inside free text, fed to [`normalize_date`].
static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \d{4}[-/.]\d{1,2}[-/.]\d{1,2}
        | \d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}
        | (?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}
        | (?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s*-?\s*\d{4}
        ",
    )
    .unwrap()
});

/// Normalize one date token, using `context` only to complete partials.
///
/// Returns `None` when the token is not recognizably a date (including
/// calendar-invalid readings like month 13).
#[must_use = "normalized date is returned but not used"]
pub fn normalize_date(token: &str, context: &str) -> Option<String> {
    let token = token.trim().trim_end_matches(['.', ',']);
    if token.is_empty() {
        return None;
    }

    if let Some(caps) = YEAR_FIRST.captures(token) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return canonical(year, month, day);
    }

    if let Some(caps) = DAY_FIRST.captures(token) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year_raw: u32 = caps[3].parse().ok()?;
        let year = expand_year(year_raw);
        return canonical(year, month, day);
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(token) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return canonical(year, month, day);
    }

    if let Some(caps) = MONTH_YEAR.captures(token) {
        let month = month_number(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        return canonical(year, month, 1);
    }

    // Partial like "OCT 24": the trailing digits are ambiguous, so the
    // year comes from the surrounding text (or the current year).
    if let Some(caps) = MONTH_PARTIAL.captures(token) {
        let month = month_number(&caps[1])?;
        let year = sniff_year(context).unwrap_or_else(|| Utc::now().year());
        return canonical(year, month, 1);
    }

    None
}

/// First plausible `20xx` year mentioned in the surrounding OCR text.
#[must_use = "sniffed year is returned but not used"]
pub fn sniff_year(context: &str) -> Option<i32> {
    CONTEXT_YEAR
        .captures(context)
        .and_then(|caps| caps[1].parse().ok())
}

/// All full (non-partial) dates found in free text, normalized, in order.
#[must_use = "found dates are returned but not used"]
pub fn find_full_dates(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for token in DATE_TOKEN.find_iter(text) {
        if let Some(date) = normalize_date(token.as_str(), text) {
            if !found.contains(&date) {
                found.push(date);
            }
        }
    }
    found
}

/// First date found in a hint window, partials included.
#[must_use = "found date is returned but not used"]
pub fn date_from_window(window: &str, context: &str) -> Option<String> {
    if let Some(token) = DATE_TOKEN.find(window) {
        if let Some(date) = normalize_date(token.as_str(), context) {
            return Some(date);
        }
    }
    // No full date; look for a "MON yy" partial after a marker
    static PARTIAL_IN_LINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)\b((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)\.?,?\s*-?\s*(\d{1,2})\b",
        )
        .unwrap()
    });
    for caps in PARTIAL_IN_LINE.captures_iter(window) {
        let token = format!("{} {}", &caps[1], &caps[2]);
        if let Some(date) = normalize_date(&token, context) {
            return Some(date);
        }
    }
    None
}

// Wrap is unreachable: the capture is at most four digits
#[allow(clippy::cast_possible_wrap)]
fn expand_year(two_or_four: u32) -> i32 {
    if two_or_four >= 100 {
        two_or_four as i32
    } else if two_or_four >= CENTURY_PIVOT {
        1900 + two_or_four as i32
    } else {
        2000 + two_or_four as i32
    }
}

fn canonical(year: i32, month: u32, day: u32) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|prefix| lower.starts_with(prefix))
        .map(|i| i as u32 + 1)
}
