//! Record → document text projection
//!
//! Every record is rendered into a single labelled line that is embedded verbatim.
//! The label order is therefore part of the embedding contract: any change to
//! [`layout`] changes [`format_tag`], which invalidates previously cached vectors.

use std::sync::OnceLock;

use crate::models::{EntityKind, Record};

/// Rendered in place of a missing or blank field.
pub const PLACEHOLDER: &str = "N/A";

/// Bumped by hand when rendering changes in a way the layout table does not capture.
const FORMAT_REVISION: u32 = 1;

/// A labelled slot in a rendered document, filled from the first matching alias.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

const fn field(label: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec { label, aliases }
}

const DRUG_FIELDS: &[FieldSpec] = &[
    field("Class", &["class", "drug_class", "category"]),
    field("Uses", &["uses", "indications", "used_for"]),
    field("Side Effects", &["side_effects", "adverse_effects"]),
    field("Contraindications", &["contraindications", "contra", "warnings"]),
];

const CONDITION_FIELDS: &[FieldSpec] = &[
    field("Description", &["description", "overview"]),
    field("Symptoms", &["symptoms", "common_symptoms"]),
    field("Causes", &["causes", "risk_factors"]),
    field("Treatment", &["treatment", "treatments", "management"]),
    field("When To Seek Help", &["when_to_seek_help", "seek_help", "red_flags"]),
];

const SYMPTOM_FIELDS: &[FieldSpec] = &[
    field("Description", &["description", "overview"]),
    field("Possible Causes", &["possible_causes", "causes"]),
    field("Severity", &["severity", "urgency"]),
    field("Recommended Action", &["recommended_action", "action", "advice"]),
];

const SOLUTION_FIELDS: &[FieldSpec] = &[
    field("Applies To", &["applies_to", "condition", "for"]),
    field("Steps", &["steps", "instructions", "procedure"]),
    field("Precautions", &["precautions", "warnings", "notes"]),
];

/// Heading label and ordered field slots for `kind`.
pub fn layout(kind: EntityKind) -> (&'static str, &'static [FieldSpec]) {
    match kind {
        EntityKind::Drug => ("Drug", DRUG_FIELDS),
        EntityKind::Condition => ("Condition", CONDITION_FIELDS),
        EntityKind::Symptom => ("Symptom", SYMPTOM_FIELDS),
        EntityKind::Solution => ("Solution", SOLUTION_FIELDS),
    }
}

/// Render `record` as a document of the given kind. Pure; never fails.
pub fn render(record: &Record, kind: EntityKind) -> String {
    let (heading, fields) = layout(kind);
    let name = match record.name.trim() {
        "" => PLACEHOLDER,
        n => n,
    };

    let mut parts = Vec::with_capacity(fields.len() + 1);
    parts.push(format!("{}: {}", heading, name));
    for slot in fields {
        let value = record.field(slot.aliases).unwrap_or(PLACEHOLDER);
        parts.push(format!("{}: {}", slot.label, value));
    }
    parts.join(" | ")
}

/// Hash of the rendering layout, attached to every cached vector.
pub fn format_tag() -> &'static str {
    static TAG: OnceLock<String> = OnceLock::new();
    TAG.get_or_init(|| {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format!("rev={};placeholder={}", FORMAT_REVISION, PLACEHOLDER).as_bytes());
        for kind in EntityKind::ALL {
            let (heading, fields) = layout(kind);
            hasher.update(format!("\n{}", heading).as_bytes());
            for slot in fields {
                hasher.update(format!("|{}={}", slot.label, slot.aliases.join(",")).as_bytes());
            }
        }
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..16].to_string()
    })
}
