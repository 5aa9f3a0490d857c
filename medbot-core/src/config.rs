use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MedbotConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// On-disk layout of the local medical dataset.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorpusFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    pub root: String,
    pub format: CorpusFormat,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: "data".to_string(),
            format: CorpusFormat::Json,
        }
    }
}

impl CorpusConfig {
    pub fn root_path(&self) -> PathBuf {
        expand_path(&self.root)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `gemini`, `gemini-fallback` or `hashing`
    pub backend: String,
    pub gemini_model: String,
    pub dimensions: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Base path for persisted vectors; each embedding model gets its own file beside
    /// it. Unset disables the file cache.
    pub cache_path: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            gemini_model: "text-embedding-004".to_string(),
            dimensions: 768,
            max_retries: 3,
            retry_delay_ms: 1000,
            cache_path: None,
        }
    }
}

impl EmbeddingSettings {
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.cache_path.as_deref().map(expand_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-lite".to_string(),
            temperature: None,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Ranking knobs. Neither value is derived from the data; both are tunable.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub match_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            match_threshold: 0.3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8767,
        }
    }
}

impl MedbotConfig {
    /// Load `path` (optional) layered with `MEDBOT__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("MEDBOT").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}

/// API key for the Gemini endpoints, taken from the environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var("GOOGLE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
