//! Batch code repair and multi-source voting.
//!
//! Batch/lot codes have a tight canonical shape - 2-5 letters, a space,
//! 4-6 digits - which makes them unusually repairable: a digit sitting
//! inside a run of letters is almost always an OCR letter misread, and
//! a handful of ligature bugs recur across engines. Candidates that still
//! fail the shape after repair never get to vote.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Canonical shape: letters, single space, digits.
static BATCH_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{2,5}) ?(\d{4,6})$").unwrap());

/// `LETTERS DIGITS`-shaped runs inside free text, for the raw sweep pool.
static BATCH_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,5})[ -]?(\d{4,6})\b").unwrap());

/// Weight of a candidate found next to a batch/lot keyword.
const KEYWORD_WEIGHT: u32 = 2;

/// Weight of a raw-sweep occurrence or an extractor's own guess.
const SWEEP_WEIGHT: u32 = 1;

/// An ephemeral tally entry used only inside [`vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchVote {
    token: String,
    score: u32,
}

/// Canonicalize a noisy batch token, or reject it.
///
/// Repairs applied in order: uppercase; strip everything outside
/// `[A-Z0-9 ]`; collapse whitespace; digit-amid-letters confusions
/// (`0`->`O`, `1`->`I`, `5`->`S`, only with letters on both sides); the
/// recurring "B L (SL)" ligature (`FBLSL` -> `FBSL`). The result must
/// match `^[A-Z]{2,5} \d{4,6}$` or the token is dropped.
#[must_use = "normalized batch token is returned but not used"]
pub fn normalize_batch_token(raw: &str) -> Option<String> {
    let upper: String = raw
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = upper.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let repaired = repair_letter_runs(&collapsed).replace("BLSL", "BSL");

    let caps = BATCH_SHAPE.captures(&repaired)?;
    Some(format!("{} {}", &caps[1], &caps[2]))
}

/// Replace confusable digits that sit between two letters.
fn repair_letter_runs(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev_letter = i > 0 && chars[i - 1].is_ascii_alphabetic();
        let next_letter = i + 1 < chars.len() && chars[i + 1].is_ascii_alphabetic();
        let repaired = match c {
            '0' if prev_letter && next_letter => 'O',
            '1' if prev_letter && next_letter => 'I',
            '5' if prev_letter && next_letter => 'S',
            other => other,
        };
        out.push(repaired);
    }
    out
}

/// Candidate tokens appearing in one blob of text, un-normalized.
fn candidates_in(text: &str) -> Vec<String> {
    BATCH_RUN
        .captures_iter(&text.to_uppercase())
        .map(|caps| format!("{} {}", &caps[1], &caps[2]))
        .collect()
}

/// Reconcile the batch number across all evidence pools.
///
/// Pools and weights:
/// - lines adjacent to a batch/lot keyword: weight 2 per candidate
/// - a sweep of every image's raw OCR text: weight 1 per occurrence
/// - the model's and regex extractor's own guesses: weight 1 each
///
/// Every candidate is normalized before tallying; candidates that fail
/// normalization do not vote. Highest cumulative weight wins; ties break
/// to the shortest normalized token, then lexicographically, so the
/// outcome is deterministic for any input multiset.
#[must_use = "winning batch token is returned but not used"]
pub fn vote(
    keyword_windows: &[String],
    raw_texts: &[String],
    guesses: &[Option<&str>],
) -> Option<String> {
    let mut tally: Vec<BatchVote> = Vec::new();
    let mut add = |token: Option<String>, weight: u32| {
        let Some(token) = token else { return };
        match tally.iter_mut().find(|vote| vote.token == token) {
            Some(vote) => vote.score += weight,
            None => tally.push(BatchVote { token, score: weight }),
        }
    };

    for window in keyword_windows {
        for candidate in candidates_in(window) {
            add(normalize_batch_token(&candidate), KEYWORD_WEIGHT);
        }
    }
    for text in raw_texts {
        for candidate in candidates_in(text) {
            add(normalize_batch_token(&candidate), SWEEP_WEIGHT);
        }
    }
    for guess in guesses.iter().flatten() {
        add(normalize_batch_token(guess), SWEEP_WEIGHT);
    }

    if tally.is_empty() {
        return None;
    }
    debug!(candidates = tally.len(), "batch vote tally complete");

    tally
        .into_iter()
        .max_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| b.token.len().cmp(&a.token.len()))
                .then_with(|| b.token.cmp(&a.token))
        })
        .map(|vote| vote.token)
}
