//! Embedding index built once at start-up
//!
//! Every corpus record is projected to text and embedded. Vectors can be reused from
//! an [`EmbeddingCache`] file, which is only trusted when its format tag, model and
//! vector width match the running projector and backend. Each model gets its own
//! cache file next to the configured path (see [`EmbeddingCache::path_for`]). A record whose embedding fails is
//! skipped with a warning; the build itself never fails.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::embeddings::EmbeddingBackend;
use crate::error::MedbotError;
use crate::models::{EntityKind, Record};
use crate::projector;
use crate::rank::{self, Scored};

/// A record with its rendered document and embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub record: Record,
    pub text: String,
    pub vector: Vec<f32>,
    /// Projector format the text (and therefore the vector) came from.
    pub format_tag: String,
}

impl IndexEntry {
    pub fn new(record: Record, text: String, vector: Vec<f32>) -> Self {
        Self {
            record,
            text,
            vector,
            format_tag: projector::format_tag().to_string(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.record.kind
    }

    pub fn source(&self) -> &str {
        &self.record.source
    }
}

/// Outcome counters of an index build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub embedded: usize,
    pub cache_hits: usize,
    pub skipped: usize,
}

/// Immutable set of index entries with uniform dimensionality.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    entries: Vec<IndexEntry>,
    dimensions: Option<usize>,
}

impl SemanticIndex {
    /// Embed every record of `corpus` with `backend`, consulting `cache` first.
    ///
    /// Newly computed vectors are written into `cache` so the caller can persist it.
    pub async fn build(
        corpus: &Corpus,
        backend: &dyn EmbeddingBackend,
        cache: &mut EmbeddingCache,
    ) -> (SemanticIndex, BuildReport) {
        let mut index = SemanticIndex::default();
        let mut report = BuildReport::default();

        for record in corpus.iter() {
            report.documents += 1;
            let text = projector::render(record, record.kind);

            let cached = cache
                .get(&text)
                .filter(|v| v.len() == backend.dimensions())
                .map(<[f32]>::to_vec);
            let vector = match cached {
                Some(v) => {
                    report.cache_hits += 1;
                    v
                }
                None => match backend.embed(&text).await {
                    Ok(Some(v)) => {
                        report.embedded += 1;
                        cache.insert(&text, v.clone());
                        v
                    }
                    Ok(None) => {
                        tracing::warn!(
                            record = %record.name,
                            backend = backend.name(),
                            "Embedding unavailable, record left out of the index"
                        );
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            record = %record.name,
                            source = %record.provenance(),
                            error = %e,
                            "Failed to embed record, skipping"
                        );
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            if let Err(e) = index.push(IndexEntry::new(record.clone(), text, vector)) {
                tracing::warn!(record = %record.name, error = %e, "Rejected index entry");
                report.skipped += 1;
            }
        }

        tracing::info!(
            documents = report.documents,
            embedded = report.embedded,
            cache_hits = report.cache_hits,
            skipped = report.skipped,
            dimensions = index.dimensions.unwrap_or(0),
            "Semantic index built"
        );

        (index, report)
    }

    /// Append an entry, enforcing that all vectors share one dimension.
    pub fn push(&mut self, entry: IndexEntry) -> Result<(), MedbotError> {
        if entry.vector.is_empty() {
            return Err(MedbotError::Other("empty embedding vector".to_string()));
        }
        match self.dimensions {
            Some(d) if d != entry.vector.len() => {
                return Err(MedbotError::Other(format!(
                    "dimension mismatch: index has {}, entry has {}",
                    d,
                    entry.vector.len()
                )));
            }
            Some(_) => {}
            None => self.dimensions = Some(entry.vector.len()),
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Top-`k` entries for an already-embedded query.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Scored<'_>> {
        rank::rank(query, &self.entries, k)
    }
}

// ============================================================================
// EmbeddingCache
// ============================================================================

/// Document-text → vector store, tagged with projector format and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCache {
    pub format_tag: String,
    pub model: String,
    /// Width of every stored vector. Files written without it load as 0 and are stale.
    #[serde(default)]
    pub dimensions: usize,
    /// Keyed by blake3 hash of the document text.
    vectors: HashMap<String, Vec<f32>>,
    #[serde(skip)]
    dirty: bool,
}

impl EmbeddingCache {
    /// Empty cache for the current projector format, `model` and vector width.
    pub fn new(model: &str, dimensions: usize) -> Self {
        Self {
            format_tag: projector::format_tag().to_string(),
            model: model.to_string(),
            dimensions,
            vectors: HashMap::new(),
            dirty: false,
        }
    }

    /// Cache file for `model` beside `base`: `embeddings.json` becomes
    /// `embeddings.text-embedding-004.json`. Switching backends leaves the other
    /// model's file untouched.
    pub fn path_for(base: &Path, model: &str) -> PathBuf {
        let slug: String = model
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "embeddings".to_string());
        let ext = base
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "json".to_string());
        base.with_file_name(format!("{}.{}.{}", stem, slug, ext))
    }

    /// Read `path`, discarding it when missing, unreadable or stale.
    pub fn load(path: &Path, model: &str, dimensions: usize) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No embedding cache yet");
                return Self::new(model, dimensions);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read embedding cache");
                return Self::new(model, dimensions);
            }
        };

        let cache: EmbeddingCache = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt embedding cache, rebuilding");
                return Self::new(model, dimensions);
            }
        };

        if cache.format_tag != projector::format_tag()
            || cache.model != model
            || cache.dimensions != dimensions
        {
            tracing::info!(
                path = %path.display(),
                cached_format = %cache.format_tag,
                cached_model = %cache.model,
                cached_dimensions = cache.dimensions,
                current_format = projector::format_tag(),
                current_model = model,
                current_dimensions = dimensions,
                "Embedding cache is stale, invalidating"
            );
            let mut fresh = Self::new(model, dimensions);
            fresh.dirty = true;
            return fresh;
        }

        tracing::info!(path = %path.display(), vectors = cache.vectors.len(), "Loaded embedding cache");
        cache
    }

    /// Write the cache if it changed since load.
    pub fn save(&mut self, path: &Path) -> Result<(), MedbotError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(self)?;
        std::fs::write(path, body)?;
        self.dirty = false;
        tracing::info!(path = %path.display(), vectors = self.vectors.len(), "Saved embedding cache");
        Ok(())
    }

    pub fn get(&self, text: &str) -> Option<&[f32]> {
        self.vectors.get(&text_key(text)).map(Vec::as_slice)
    }

    pub fn insert(&mut self, text: &str, vector: Vec<f32>) {
        self.vectors.insert(text_key(text), vector);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn text_key(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}
