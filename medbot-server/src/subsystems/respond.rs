//! Rank-and-respond: route a query by intent and produce the user-facing reply
//!
//! Routing:
//! - medication → extract the drug name, ground on the local drug entry, medication prompt
//! - condition  → extract the condition name, ground on the local entry, condition prompt
//! - emergency  → retrieval-augmented answer behind an emergency banner
//! - symptom / general → retrieval-augmented answer
//!
//! Provider failures never escape: they become an apology in the reply text.

use medbot_core::intent::ENTITY_PREFIXES;
use medbot_core::prompts::{self, ContextItem};
use medbot_core::{classify, extract_entity_name, EntityKind, Intent, ProviderError};
use serde::Serialize;

use crate::assistant::Assistant;
use crate::subsystems::retrieve::Match;

pub const DATABASE_FOOTER: &str = "📚 *Information sourced from medical database*";
pub const GENERAL_FOOTER: &str =
    "💡 *General medical information - consult healthcare provider for personalized advice*";
pub const EMERGENCY_BANNER: &str = "🚨 **If this is a medical emergency, call your local emergency number immediately.** Do not rely on this assistant in an emergency.";

/// Where the content of a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Database,
    GeneralKnowledge,
    Error,
}

impl AnswerSource {
    fn footer(&self) -> Option<&'static str> {
        match self {
            AnswerSource::Database => Some(DATABASE_FOOTER),
            AnswerSource::GeneralKnowledge => Some(GENERAL_FOOTER),
            AnswerSource::Error => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,
    pub intent: Intent,
    pub source: AnswerSource,
    pub matches: Vec<Match>,
}

impl Reply {
    fn new(text: String, intent: Intent, source: AnswerSource, matches: Vec<Match>) -> Self {
        let text = match source.footer() {
            Some(footer) => format!("{}\n\n{}", text, footer),
            None => text,
        };
        Self {
            text,
            intent,
            source,
            matches,
        }
    }

    fn apology(text: String, intent: Intent, matches: Vec<Match>) -> Self {
        Self::new(text, intent, AnswerSource::Error, matches)
    }
}

pub async fn respond(assistant: &Assistant, query: &str) -> Reply {
    let intent = classify(query);
    tracing::info!(%intent, "Routing query");

    match intent {
        Intent::Medication => {
            let name = extract_entity_name(query, ENTITY_PREFIXES);
            entity_info(assistant, EntityKind::Drug, &name, intent).await
        }
        Intent::Condition => {
            let name = extract_entity_name(query, ENTITY_PREFIXES);
            entity_info(assistant, EntityKind::Condition, &name, intent).await
        }
        Intent::Emergency => {
            let mut reply = answer(assistant, query, intent).await;
            reply.text = format!("{}\n\n{}", EMERGENCY_BANNER, reply.text);
            reply
        }
        Intent::Symptom | Intent::General => answer(assistant, query, intent).await,
    }
}

/// Structured overview of one drug or condition, grounded on the first local
/// record whose name matches.
pub async fn entity_info(
    assistant: &Assistant,
    kind: EntityKind,
    name: &str,
    intent: Intent,
) -> Reply {
    let local = assistant.lookup(kind, name);
    let prompt = match kind {
        EntityKind::Drug => prompts::medication_prompt(name, local),
        _ => prompts::condition_prompt(name, local),
    };

    let (source, matches) = match local {
        Some(record) => {
            tracing::debug!(record = %record.name, source = %record.provenance(), "Local entry found");
            (
                AnswerSource::Database,
                vec![Match {
                    name: record.name.clone(),
                    kind: record.kind,
                    source: record.source.clone(),
                    score: 1.0,
                }],
            )
        }
        None => (AnswerSource::GeneralKnowledge, Vec::new()),
    };

    let label = match kind {
        EntityKind::Drug => "medication",
        _ => "condition",
    };

    match assistant.generator().generate(&prompt).await {
        Ok(text) => Reply::new(text, intent, source, matches),
        Err(ProviderError::EmptyCompletion { reason }) => {
            tracing::warn!(name, reason = ?reason, "Empty completion");
            Reply::apology(
                format!("Could not retrieve information about {}.", name),
                intent,
                matches,
            )
        }
        Err(e) => {
            tracing::warn!(name, error = %e, backend = assistant.generator().name(), "Generation failed");
            Reply::apology(
                format!("⚠️ Error retrieving {} information: {}", label, e),
                intent,
                matches,
            )
        }
    }
}

/// Retrieval-augmented answer: confident local matches become prompt context,
/// otherwise the prompt asks for general knowledge.
pub async fn answer(assistant: &Assistant, query: &str, intent: Intent) -> Reply {
    let retrieval = match assistant.search(query).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, backend = assistant.embedder().name(), "Query embedding failed");
            return Reply::apology(format!("⚠️ Error generating response: {}", e), intent, Vec::new());
        }
    };

    let context: Vec<ContextItem<'_>> = retrieval
        .context()
        .iter()
        .map(|scored| ContextItem {
            provenance: scored.entry.record.provenance(),
            text: &scored.entry.text,
        })
        .collect();

    let source = if context.is_empty() {
        AnswerSource::GeneralKnowledge
    } else {
        AnswerSource::Database
    };
    let prompt = prompts::answer_prompt(query, &context);
    let matches = retrieval.matches();

    match assistant.generator().generate(&prompt).await {
        Ok(text) => Reply::new(text, intent, source, matches),
        Err(ProviderError::EmptyCompletion { .. }) => Reply::new(
            "I'm sorry, I couldn't generate a response.".to_string(),
            intent,
            source,
            matches,
        ),
        Err(e) => {
            tracing::warn!(error = %e, backend = assistant.generator().name(), "Generation failed");
            Reply::apology(format!("⚠️ Error generating response: {}", e), intent, matches)
        }
    }
}
