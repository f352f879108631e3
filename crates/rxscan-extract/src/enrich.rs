//! Ingredient -> uses lookup applied when the models found no uses text.
//!
//! Heuristic enrichment only - these strings describe what the product is
//! commonly sold for, not verified medical guidance.

/// Substring-keyed lookup table. Keys are lowercase.
const USES_TABLE: &[(&str, &str)] = &[
    ("paracetamol", "Fever, mild to moderate pain"),
    ("cetamol", "Fever, mild to moderate pain"),
    ("ibuprofen", "Pain, inflammation, fever"),
    ("amoxicillin", "Bacterial infections"),
    ("azithromycin", "Bacterial infections"),
    ("ciprofloxacin", "Bacterial infections"),
    ("cetirizine", "Allergic rhinitis, urticaria"),
    ("metformin", "Type 2 diabetes"),
    ("omeprazole", "Acid reflux, peptic ulcer"),
    ("pantoprazole", "Acid reflux, peptic ulcer"),
    ("salbutamol", "Asthma, bronchospasm"),
    ("amlodipine", "Hypertension"),
    ("jeevan jal", "Dehydration, electrolyte replacement"),
];

/// Look up common uses for a resolved product name.
#[must_use = "lookup result is returned but not used"]
pub fn uses_for(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    USES_TABLE
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, uses)| *uses)
}
