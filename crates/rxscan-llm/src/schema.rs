//! The shared JSON-schema contract both model tiers answer under.

/// Schema + rules block shared by the vision and text prompts.
///
/// The contract is deliberately strict: only values visibly present on the
/// label, `null` for everything else, and batch codes already normalized
/// to the canonical `LETTERS SPACE DIGITS` shape.
pub const LABEL_SCHEMA_PROMPT: &str = r#"You are a pharmacy inventory assistant reading a medicine package label.

OUTPUT JSON SCHEMA:
{
  "name": "<product name as printed>" or null,
  "manufacturing_date": "<as printed>" or null,
  "batch_number": "<LETTERS SPACE DIGITS>" or null,
  "expiry_date": "<as printed>" or null,
  "slips_count": <int> or null,
  "tablets_per_slip": <int> or null,
  "mrp_amount": <number> or null,
  "mrp_currency": "<NPR|INR|...>" or null,
  "mrp_text": "<the MRP line verbatim>" or null,
  "uses_on_label": "<uses/indications printed on the label>" or null,
  "active_ingredient_on_label": "<as printed>" or null,
  "strength_on_label": "<e.g. 500 mg>" or null,
  "dosage_form_on_label": "<tablet|capsule|syrup|suspension|...>" or null
}

EXTRACTION RULES:
1. Return ONLY values visibly present on the label. Never infer or guess.
2. Use null for anything you cannot read. Never use an empty string.
3. Normalize the batch code to uppercase LETTERS, one space, DIGITS
   (2-5 letters, 4-6 digits). OCR sometimes inserts a stray "L" between
   "B" and "SL"; "FBLSL 2209" on a blurry print is actually "FBSL 2209".
4. Copy dates exactly as printed, including partial dates like "OCT 24".
5. slips_count and tablets_per_slip come from pack-size text like
   "10 x 10 TABLETS"; leave both null if the pack size is not printed.
6. mrp_text is the full price line verbatim; mrp_amount is its number.

Return ONLY valid JSON. No markdown, no explanation."#;

/// Batch shape the text tier must satisfy (stated in its prompt).
pub const BATCH_SHAPE_NOTE: &str =
    "The batch_number must match ^[A-Z]{2,5} [0-9]{4,6}$ after normalization, else return null.";
