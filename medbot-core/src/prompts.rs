//! Prompt templates sent to the generation provider

use crate::models::{EntityKind, Record};
use crate::projector;

const SAFETY_RULES: &str = "\
SAFETY RULES (always follow):
1. For emergencies (choking, chest pain, difficulty breathing, severe allergic reactions) tell the user to call emergency services immediately.
2. State clearly that this is general information, not medical advice.
3. Recommend consulting a healthcare professional for personal concerns.
4. When medications are discussed, stress talking to a doctor or pharmacist before taking anything.
5. Be accurate and conservative.";

/// One local match offered to the model as context.
#[derive(Debug, Clone)]
pub struct ContextItem<'a> {
    pub provenance: String,
    pub text: &'a str,
}

/// Retrieval-augmented answer prompt. `context` empty means no confident local match.
pub fn answer_prompt(query: &str, context: &[ContextItem<'_>]) -> String {
    let (note, body) = if context.is_empty() {
        (
            "This question is not covered by the local medical database; answer from general medical knowledge:",
            "No matching entries in the local medical database.".to_string(),
        )
    } else {
        (
            "Relevant entries from the local medical database:",
            context
                .iter()
                .map(|c| format!("- From {}:\n{}", c.provenance, c.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    };

    format!(
        "You are a medical information assistant. The user asked: \"{query}\"

{note}
{body}

{SAFETY_RULES}

RESPONSE GUIDELINES:
- Prefer the database entries when present; add general knowledge only where it helps.
- Use headings and bullet points.
- Cover what applies: description, uses, dosage guidance, side effects, precautions, when to seek help.
- End with a recommendation to consult a healthcare provider.

Write a clear, safety-focused answer:"
    )
}

/// Structured medication overview for `drug_name`, grounded on `local` when present.
pub fn medication_prompt(drug_name: &str, local: Option<&Record>) -> String {
    let heading = drug_name.to_uppercase();
    format!(
        "Give accurate, structured information about the medication: {drug_name}
{local}
Use exactly these sections:

**💊 {heading} - Medication Information**

**Drug Class & Common Brands:**
**Primary Uses:**
**Typical Dosage Guidelines:** (general adult guidance and dosage precautions)
**Side Effects:** (common, and serious ones needing medical attention)
**Precautions & Warnings:** (contraindications, interactions, pregnancy, children, elderly)
**Key Safety Information:** (when to avoid it, when to seek help, storage)

{SAFETY_RULES}
Dosage must always be set by a healthcare professional.",
        local = local_section(local, EntityKind::Drug),
    )
}

/// Structured condition overview for `condition_name`, grounded on `local` when present.
pub fn condition_prompt(condition_name: &str, local: Option<&Record>) -> String {
    let heading = condition_name.to_uppercase();
    format!(
        "Give accurate, structured information about the medical condition: {condition_name}
{local}
Use exactly these sections:

**🩺 {heading} - Condition Overview**

**Description & Causes:**
**Common Symptoms:**
**Diagnosis & Treatment:**
**Self-Care & Management:**
**When to Seek Medical Help:** (red flags and emergency symptoms)
**Prevention:**

{SAFETY_RULES}",
        local = local_section(local, EntityKind::Condition),
    )
}

fn local_section(local: Option<&Record>, kind: EntityKind) -> String {
    match local {
        Some(record) => format!(
            "\nLocal database entry ({}), prefer it where it applies:\n{}\n",
            record.provenance(),
            projector::render(record, kind)
        ),
        None => String::new(),
    }
}
