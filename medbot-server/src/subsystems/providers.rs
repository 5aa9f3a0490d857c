//! Provider construction from the application config
//!
//! Reads `[embedding] backend` to select Gemini, Gemini-with-fallback, or the
//! offline hashing embedder, and `[generation]` for the completion client.
//! A missing API key never aborts start-up: embeddings drop to the hashing
//! backend and generation answers every prompt with an `Unavailable` error,
//! which the respond path turns into an apology.

use std::sync::Arc;

use async_trait::async_trait;
use medbot_core::config::api_key_from_env;
use medbot_core::embeddings::{create_backend, BackendConfig, EmbeddingBackend, EmbeddingConfig};
use medbot_core::generation::{GeminiGenerationClient, GenerationBackend, GenerationConfig};
use medbot_core::hashing_embedder::HASHING_DIMENSIONS;
use medbot_core::{MedbotConfig, ProviderError, RetryPolicy};

/// Backend selector values accepted in `[embedding] backend`.
pub const EMBEDDING_BACKENDS: &[&str] = &["gemini", "gemini-fallback", "hashing"];

/// Translate `[embedding]` settings into a backend config.
pub fn embedding_backend_config(config: &MedbotConfig, api_key: Option<String>) -> BackendConfig {
    let settings = &config.embedding;
    let mut gemini = EmbeddingConfig::new(
        api_key,
        settings.gemini_model.clone(),
        settings.dimensions as usize,
    );
    gemini.retry = RetryPolicy {
        max_retries: settings.max_retries as usize,
        retry_delay_ms: settings.retry_delay_ms,
    };

    match settings.backend.as_str() {
        "hashing" => BackendConfig::Hashing {
            dimensions: HASHING_DIMENSIONS,
        },
        "gemini-fallback" => BackendConfig::GeminiFallback(gemini),
        "gemini" => BackendConfig::Gemini(gemini),
        other => {
            tracing::warn!(backend = other, "Unknown embedding backend, using gemini");
            BackendConfig::Gemini(gemini)
        }
    }
}

/// Create the embedding backend named in the config.
pub fn create_embedding_backend(
    config: &MedbotConfig,
) -> Result<Arc<dyn EmbeddingBackend>, ProviderError> {
    let backend_cfg = embedding_backend_config(config, api_key_from_env());

    match create_backend(backend_cfg) {
        Ok(backend) => Ok(Arc::from(backend)),
        Err(ProviderError::MissingApiKey) => {
            tracing::warn!(
                "No GOOGLE_API_KEY or GEMINI_API_KEY set, using the offline hashing embedder"
            );
            create_backend(BackendConfig::Hashing {
                dimensions: HASHING_DIMENSIONS,
            })
            .map(Arc::from)
        }
        Err(e) => Err(e),
    }
}

/// Create the generation backend from `[generation]`.
pub fn create_generation_backend(
    config: &MedbotConfig,
) -> Result<Arc<dyn GenerationBackend>, ProviderError> {
    let Some(api_key) = api_key_from_env() else {
        tracing::warn!("No API key for text generation, answers will report the provider as unavailable");
        return Ok(Arc::new(UnavailableGenerator::new(
            "no GOOGLE_API_KEY or GEMINI_API_KEY configured",
        )));
    };

    let settings = &config.generation;
    let client = GeminiGenerationClient::new(GenerationConfig {
        api_key,
        model: settings.model.clone(),
        temperature: settings.temperature,
        retry: RetryPolicy {
            max_retries: settings.max_retries as usize,
            retry_delay_ms: settings.retry_delay_ms,
        },
    })?;

    tracing::info!(model = client.model(), "Generation backend ready");
    Ok(Arc::new(client))
}

/// Generation backend that fails every call with a fixed reason.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
