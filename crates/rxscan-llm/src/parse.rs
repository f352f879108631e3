//! Tolerant parsing of model responses into [`CandidateRecord`]s.
//!
//! Models occasionally wrap JSON in Markdown fences or chat filler even
//! under `json_object` mode, and sometimes return numbers as strings. The
//! salvage order is: strip fences, parse; else parse the outermost `{...}`
//! span; else give up. Any failure is "tier unavailable" (`None`), never an
//! error.

use rxscan_core::CandidateRecord;
use serde_json::Value;
use tracing::warn;

/// Extract the JSON payload from a response, handling Markdown code fences.
#[must_use = "salvaged JSON text is returned but not used"]
pub fn extract_json(text: &str) -> String {
    let text = text.trim();

    // Handle ```json ... ``` wrapper
    if text.starts_with("```") {
        if let Some(start) = text.find('\n') {
            let after_first_line = &text[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    // Fall back to the outermost object span
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

/// Parse a model response into a candidate record, or `None` when the
/// response is not a usable JSON object.
#[must_use = "parsed candidate is returned but not used"]
pub fn parse_candidate(response_text: &str) -> Option<CandidateRecord> {
    let payload = extract_json(response_text);
    let value: Value = match serde_json::from_str(&payload) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "model response was not valid JSON");
            return None;
        }
    };
    let object = value.as_object()?;

    Some(CandidateRecord {
        name: get_string(object, "name"),
        manufacturing_date: get_string(object, "manufacturing_date"),
        batch_number: get_string(object, "batch_number"),
        expiry_date: get_string(object, "expiry_date"),
        slips_count: get_u32(object, "slips_count"),
        tablets_per_slip: get_u32(object, "tablets_per_slip"),
        mrp_amount: get_f64(object, "mrp_amount"),
        mrp_currency: get_string(object, "mrp_currency"),
        mrp_text: get_string(object, "mrp_text"),
        uses_on_label: get_string(object, "uses_on_label"),
        active_ingredient_on_label: get_string(object, "active_ingredient_on_label"),
        strength_on_label: get_string(object, "strength_on_label"),
        dosage_form_on_label: get_string(object, "dosage_form_on_label"),
    })
}

fn get_string(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_u32(object: &serde_json::Map<String, Value>, key: &str) -> Option<u32> {
    match object.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn get_f64(object: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches(['R', 's', '.', ' ']).parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        let wrapped = "```json\n{\"name\": \"Cetamol\"}\n```";
        assert_eq!(extract_json(wrapped), "{\"name\": \"Cetamol\"}");
    }

    #[test]
    fn salvages_outermost_object_span() {
        let chatty = "Here is the record: {\"name\": \"Cetamol\"} hope that helps!";
        assert_eq!(extract_json(chatty), "{\"name\": \"Cetamol\"}");
    }

    #[test]
    fn parses_plain_object() {
        let record = parse_candidate("{\"name\": \"Paracetamol 500mg\", \"slips_count\": 10}").unwrap();
        assert_eq!(record.name.as_deref(), Some("Paracetamol 500mg"));
        assert_eq!(record.slips_count, Some(10));
        assert!(record.expiry_date.is_none());
    }

    #[test]
    fn coerces_stringly_numbers() {
        let record =
            parse_candidate("{\"slips_count\": \"10\", \"mrp_amount\": \"120.50\"}").unwrap();
        assert_eq!(record.slips_count, Some(10));
        assert_eq!(record.mrp_amount, Some(120.50));
    }

    #[test]
    fn empty_strings_become_null() {
        let record = parse_candidate("{\"name\": \"\", \"batch_number\": \"  \"}").unwrap();
        assert!(record.name.is_none());
        assert!(record.batch_number.is_none());
    }

    #[test]
    fn unusable_response_is_none_not_error() {
        assert!(parse_candidate("I could not read the label, sorry.").is_none());
        assert!(parse_candidate("[1, 2, 3]").is_none());
        assert!(parse_candidate("").is_none());
    }
}
