//! Session boundary: corpus, semantic index and providers behind one handle
//!
//! Built once before serving and then shared read-only (`Arc<Assistant>`).
//! Conversation history is not kept here; callers own it.

use std::collections::BTreeMap;
use std::sync::Arc;

use medbot_core::embeddings::EmbeddingBackend;
use medbot_core::generation::GenerationBackend;
use medbot_core::index::BuildReport;
use medbot_core::protocol::AskMode;
use medbot_core::{
    classify, projector, Corpus, EmbeddingCache, EntityKind, Intent, MedbotConfig, ProviderError,
    Record, SemanticIndex,
};
use serde::Serialize;

use crate::subsystems::respond::{self, Reply};
use crate::subsystems::retrieve::{self, Retrieval};

pub struct Assistant {
    config: MedbotConfig,
    corpus: Corpus,
    index: SemanticIndex,
    report: BuildReport,
    embedder: Arc<dyn EmbeddingBackend>,
    generator: Arc<dyn GenerationBackend>,
}

/// Snapshot reported by `/health` and the CLI `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantStats {
    pub records: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub cache_hits: usize,
    pub dimensions: Option<usize>,
    pub counts: BTreeMap<EntityKind, usize>,
    pub embedding_backend: String,
    pub embedding_model: String,
    pub generation_backend: String,
    pub format_tag: String,
}

impl Assistant {
    /// Load the configured corpus and build the index, reusing the on-disk
    /// embedding cache when `[embedding] cache_path` is set.
    pub async fn bootstrap(
        config: MedbotConfig,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        let root = config.corpus.root_path();
        let corpus = Corpus::load(&root, config.corpus.format);
        if corpus.is_empty() {
            tracing::warn!(root = %root.display(), "Corpus is empty, answers will use general knowledge only");
        }

        let cache_file = config
            .embedding
            .cache_file()
            .map(|base| EmbeddingCache::path_for(&base, embedder.model()));
        let mut cache = match &cache_file {
            Some(path) => EmbeddingCache::load(path, embedder.model(), embedder.dimensions()),
            None => EmbeddingCache::new(embedder.model(), embedder.dimensions()),
        };

        let (index, report) = SemanticIndex::build(&corpus, embedder.as_ref(), &mut cache).await;

        if let Some(path) = &cache_file {
            if let Err(e) = cache.save(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist embedding cache");
            }
        }

        Self {
            config,
            corpus,
            index,
            report,
            embedder,
            generator,
        }
    }

    /// Build from an already loaded corpus with an in-memory cache only.
    pub async fn from_corpus(
        config: MedbotConfig,
        corpus: Corpus,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        let mut cache = EmbeddingCache::new(embedder.model(), embedder.dimensions());
        let (index, report) = SemanticIndex::build(&corpus, embedder.as_ref(), &mut cache).await;
        Self {
            config,
            corpus,
            index,
            report,
            embedder,
            generator,
        }
    }

    pub fn config(&self) -> &MedbotConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn embedder(&self) -> &dyn EmbeddingBackend {
        self.embedder.as_ref()
    }

    pub fn generator(&self) -> &dyn GenerationBackend {
        self.generator.as_ref()
    }

    pub fn classify(&self, query: &str) -> Intent {
        classify(query)
    }

    /// Rank-and-respond: classify, then route to the matching answer path.
    pub async fn respond(&self, query: &str) -> Reply {
        respond::respond(self, query).await
    }

    pub async fn ask(&self, query: &str, mode: AskMode) -> Reply {
        match mode {
            AskMode::Smart => self.respond(query).await,
            AskMode::Medication => self.medication_info(query.trim()).await,
            AskMode::Condition => self.condition_info(query.trim()).await,
        }
    }

    pub async fn medication_info(&self, drug_name: &str) -> Reply {
        respond::entity_info(self, EntityKind::Drug, drug_name, Intent::Medication).await
    }

    pub async fn condition_info(&self, condition_name: &str) -> Reply {
        respond::entity_info(self, EntityKind::Condition, condition_name, Intent::Condition).await
    }

    /// Retrieval-augmented answer without intent routing.
    pub async fn answer(&self, query: &str) -> Reply {
        respond::answer(self, query, Intent::General).await
    }

    pub async fn search(&self, query: &str) -> Result<Retrieval<'_>, ProviderError> {
        retrieve::search(query, &self.index, self.embedder(), &self.config.retrieval).await
    }

    pub fn lookup(&self, kind: EntityKind, name: &str) -> Option<&Record> {
        self.corpus.lookup(kind, name)
    }

    pub fn topics(&self) -> &[String] {
        self.corpus.topics()
    }

    pub fn stats(&self) -> AssistantStats {
        AssistantStats {
            records: self.corpus.len(),
            indexed: self.index.len(),
            skipped: self.report.skipped,
            cache_hits: self.report.cache_hits,
            dimensions: self.index.dimensions(),
            counts: self.corpus.counts(),
            embedding_backend: self.embedder.name().to_string(),
            embedding_model: self.embedder.model().to_string(),
            generation_backend: self.generator.name().to_string(),
            format_tag: projector::format_tag().to_string(),
        }
    }
}
