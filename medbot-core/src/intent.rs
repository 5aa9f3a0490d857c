//! Keyword routing for free-text questions
//!
//! [`classify`] walks [`INTENT_RULES`] in order and returns the first intent whose
//! keyword list has a member contained in the lower-cased query. There is no scoring:
//! a query that hits two lists is decided purely by table order.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Medication,
    Condition,
    Symptom,
    Emergency,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Medication => "medication",
            Intent::Condition => "condition",
            Intent::Symptom => "symptom",
            Intent::Emergency => "emergency",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MEDICATION_KEYWORDS: &[&str] = &[
    "medicine",
    "medication",
    "drug",
    "pill",
    "tablet",
    "capsule",
    "dose",
    "dosage",
    "side effect",
    "take",
    "prescription",
    "ibuprofen",
    "aspirin",
    "paracetamol",
    "antibiotic",
    "antihistamine",
    "statins",
    "blood pressure medicine",
];

const CONDITION_KEYWORDS: &[&str] = &[
    "symptom",
    "condition",
    "disease",
    "illness",
    "sick",
    "diagnosis",
    "treatment",
    "cure",
    "what is",
    "have",
    "suffering from",
];

const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "immediate",
    "right now",
    "911",
    "999",
    "ambulance",
    "emergency room",
    "critical",
    "unconscious",
    "not breathing",
    "choking",
];

const SYMPTOM_KEYWORDS: &[&str] = &[
    "pain",
    "ache",
    "fever",
    "cough",
    "rash",
    "nausea",
    "vomit",
    "dizz",
    "fatigue",
    "swelling",
    "itch",
    "sore throat",
    "shortness of breath",
    "bleeding",
];

/// Evaluation order of the classifier. First match wins.
pub const INTENT_RULES: &[(Intent, &[&str])] = &[
    (Intent::Medication, MEDICATION_KEYWORDS),
    (Intent::Condition, CONDITION_KEYWORDS),
    (Intent::Emergency, EMERGENCY_KEYWORDS),
    (Intent::Symptom, SYMPTOM_KEYWORDS),
];

/// Phrases that usually precede the entity name in a question.
pub const ENTITY_PREFIXES: &[&str] = &["about", "information on", "tell me about"];

/// Assign `query` to an intent using [`INTENT_RULES`].
pub fn classify(query: &str) -> Intent {
    let lowered = query.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General)
}

/// Pull the entity name out of `query`.
///
/// The first keyword (in list order) present in the lower-cased query decides; the
/// lower-cased text after its last occurrence is returned, trimmed. Assumes the name
/// is a suffix of the phrase: "ibuprofen, tell me about it" yields "it".
/// Falls back to the untouched query when no keyword is present or nothing follows it.
pub fn extract_entity_name(query: &str, keywords: &[&str]) -> String {
    let lowered = query.to_lowercase();
    let Some(keyword) = keywords
        .iter()
        .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
    else {
        return query.to_string();
    };

    let keyword = keyword.to_lowercase();
    let suffix = lowered
        .rsplit_once(keyword.as_str())
        .map(|(_, tail)| tail.trim())
        .unwrap_or_default();

    if suffix.is_empty() {
        query.to_string()
    } else {
        suffix.to_string()
    }
}
