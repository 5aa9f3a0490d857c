//! Retrieval subsystem: query embedding + ranking against the in-memory index
//!
//! Flow:
//! 1. Embed the query with the `RETRIEVAL_QUERY` task type
//! 2. Rank every index entry by cosine similarity, keep the top-K
//! 3. Gate on the best score: results only count as context when the top
//!    score is strictly above `match_threshold`

use medbot_core::config::RetrievalConfig;
use medbot_core::embeddings::EmbeddingBackend;
use medbot_core::rank::{is_confident, Scored};
use medbot_core::{EntityKind, ProviderError, SemanticIndex};
use serde::Serialize;

/// One ranked document, flattened for responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub name: String,
    pub kind: EntityKind,
    pub source: String,
    pub score: f32,
}

impl From<&Scored<'_>> for Match {
    fn from(scored: &Scored<'_>) -> Self {
        Self {
            name: scored.entry.record.name.clone(),
            kind: scored.entry.kind(),
            source: scored.entry.source().to_string(),
            score: scored.score,
        }
    }
}

/// Top-K results for one query and whether they clear the threshold.
pub struct Retrieval<'a> {
    pub results: Vec<Scored<'a>>,
    pub confident: bool,
}

impl<'a> Retrieval<'a> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            confident: false,
        }
    }

    pub fn matches(&self) -> Vec<Match> {
        self.results.iter().map(Match::from).collect()
    }

    /// Results to use as prompt context; empty unless confident.
    pub fn context(&self) -> &[Scored<'a>] {
        if self.confident {
            &self.results
        } else {
            &[]
        }
    }
}

/// Embed `query` and rank it against `index`.
///
/// An empty index or a backend that declines to embed yields an empty,
/// non-confident retrieval rather than an error.
pub async fn search<'a>(
    query: &str,
    index: &'a SemanticIndex,
    backend: &dyn EmbeddingBackend,
    config: &RetrievalConfig,
) -> Result<Retrieval<'a>, ProviderError> {
    if index.is_empty() {
        tracing::debug!("Index is empty, skipping query embedding");
        return Ok(Retrieval::empty());
    }

    let Some(query_vec) = backend.embed_query(query).await? else {
        tracing::warn!(backend = backend.name(), "Query embedding unavailable");
        return Ok(Retrieval::empty());
    };

    let results = index.search(&query_vec, config.top_k);
    let confident = is_confident(&results, config.match_threshold);

    tracing::debug!(
        count = results.len(),
        top_score = results.first().map(|r| r.score).unwrap_or(0.0),
        confident,
        "Ranked query against index"
    );

    Ok(Retrieval { results, confident })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbot_core::{Corpus, EmbeddingCache, HashingEmbeddingClient, Record};

    fn corpus() -> Corpus {
        Corpus::from_records(vec![
            Record::new(EntityKind::Drug, "Ibuprofen", "drug_database")
                .with_field("class", "NSAID")
                .with_field("uses", "pain, fever, inflammation"),
            Record::new(EntityKind::Condition, "Asthma", "medical_conditions")
                .with_field("symptoms", "wheezing, shortness of breath"),
            Record::new(EntityKind::Symptom, "Headache", "symptoms")
                .with_field("possible_causes", "tension, dehydration, migraine"),
        ])
    }

    async fn build(backend: &HashingEmbeddingClient) -> SemanticIndex {
        let mut cache = EmbeddingCache::new(backend.model(), backend.dimensions());
        let (index, _report) = SemanticIndex::build(&corpus(), backend, &mut cache).await;
        index
    }

    #[tokio::test]
    async fn test_search_returns_top_k_ordered_by_similarity() {
        let backend = HashingEmbeddingClient::default();
        let index = build(&backend).await;
        let config = RetrievalConfig {
            top_k: 2,
            match_threshold: 0.3,
        };

        let retrieval = search("asthma wheezing breath", &index, &backend, &config)
            .await
            .unwrap();

        assert_eq!(retrieval.results.len(), 2);
        assert_eq!(retrieval.results[0].entry.record.name, "Asthma");
        assert!(retrieval.results[0].score >= retrieval.results[1].score);
    }

    #[tokio::test]
    async fn test_exact_document_text_is_confident() {
        let backend = HashingEmbeddingClient::default();
        let index = build(&backend).await;
        let text = index.entries()[0].text.clone();

        let retrieval = search(&text, &index, &backend, &RetrievalConfig::default())
            .await
            .unwrap();

        assert!(retrieval.confident);
        assert!((retrieval.results[0].score - 1.0).abs() < 1e-4);
        assert_eq!(retrieval.context().len(), retrieval.results.len());
    }

    #[tokio::test]
    async fn test_unrelated_query_is_not_confident() {
        let backend = HashingEmbeddingClient::default();
        let index = build(&backend).await;
        let config = RetrievalConfig {
            top_k: 5,
            match_threshold: 0.99,
        };

        let retrieval = search("quantum chromodynamics", &index, &backend, &config)
            .await
            .unwrap();

        assert!(!retrieval.confident);
        assert!(retrieval.context().is_empty());
        assert_eq!(retrieval.matches().len(), retrieval.results.len());
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let backend = HashingEmbeddingClient::default();
        let index = SemanticIndex::default();

        let retrieval = search("anything", &index, &backend, &RetrievalConfig::default())
            .await
            .unwrap();

        assert!(retrieval.results.is_empty());
        assert!(!retrieval.confident);
    }

    #[tokio::test]
    async fn test_match_flattens_provenance() {
        let backend = HashingEmbeddingClient::default();
        let index = build(&backend).await;

        let retrieval = search("ibuprofen nsaid", &index, &backend, &RetrievalConfig::default())
            .await
            .unwrap();
        let matches = retrieval.matches();
        let top = &matches[0];

        assert_eq!(top.name, "Ibuprofen");
        assert_eq!(top.kind, EntityKind::Drug);
        assert_eq!(top.source, "drug_database");
    }
}
