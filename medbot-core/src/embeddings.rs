//! Embedding providers
//!
//! The [`EmbeddingBackend`] trait is the seam the index builder and the ranker use;
//! implementations:
//! - **Gemini**: `embedContent` over the REST API (768-dim by default)
//! - **Gemini-fallback**: Gemini that degrades to `Ok(None)` instead of erroring
//! - **Hashing**: deterministic, offline feature hashing (see `hashing_embedder`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::gemini::{GeminiTransport, ProviderError, RetryPolicy};
use crate::hashing_embedder::HashingEmbeddingClient;

/// Vector width requested from Gemini unless configured otherwise.
pub const GEMINI_DIMENSIONS: usize = 768;

/// Default Gemini embedding model
pub const GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Turns record and query text into vectors.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a corpus document. `None` means the backend is degraded and the
    /// document should be skipped.
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError>;

    /// Embed a search query. Defaults to [`EmbeddingBackend::embed`]; Gemini
    /// overrides it with the `RETRIEVAL_QUERY` task type.
    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        self.embed(text).await
    }

    /// Length of every vector this backend returns.
    fn dimensions(&self) -> usize;

    /// Short identifier shown in health output and logs.
    fn name(&self) -> &str;

    /// Model identity recorded alongside cached vectors.
    fn model(&self) -> &str;
}

/// Task type hint for the embedding API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    RetrievalDocument,
    RetrievalQuery,
}

/// Settings for the Gemini embedding clients.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
    pub retry: RetryPolicy,
}

impl EmbeddingConfig {
    pub fn new(api_key: Option<String>, model: String, dimensions: usize) -> Self {
        Self {
            api_key: api_key
                .or_else(crate::config::api_key_from_env)
                .unwrap_or_default(),
            model,
            dimensions,
            retry: RetryPolicy::default(),
        }
    }
}

/// Which embedding backend to build.
pub enum BackendConfig {
    Gemini(EmbeddingConfig),
    GeminiFallback(EmbeddingConfig),
    Hashing { dimensions: usize },
}

/// Create the backend described by `config`.
pub fn create_backend(config: BackendConfig) -> Result<Box<dyn EmbeddingBackend>, ProviderError> {
    match config {
        BackendConfig::Gemini(c) => Ok(Box::new(GeminiEmbeddingClient::new(c)?)),
        BackendConfig::GeminiFallback(c) => Ok(Box::new(FallbackEmbeddingClient::new(c)?)),
        BackendConfig::Hashing { dimensions } => {
            Ok(Box::new(HashingEmbeddingClient::new(dimensions)))
        }
    }
}

// Wire types for `embedContent`.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Calls the Gemini `embedContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingClient {
    transport: GeminiTransport,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, ProviderError> {
        let transport = GeminiTransport::new(config.api_key, config.retry)?;
        Ok(Self {
            transport,
            model: config.model,
            dimensions: config.dimensions,
        })
    }

    /// Point the client at another host, e.g. a wiremock server.
    pub fn with_base_url(config: EmbeddingConfig, base_url: String) -> Result<Self, ProviderError> {
        let transport = GeminiTransport::with_base_url(config.api_key, config.retry, base_url)?;
        Ok(Self {
            transport,
            model: config.model,
            dimensions: config.dimensions,
        })
    }

    /// Embed `text` with an explicit task type, returning the raw vector.
    pub async fn embed_with_task(
        &self,
        text: &str,
        task_type: TaskType,
    ) -> Result<Vec<f32>, ProviderError> {
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: [Part { text }],
            },
            task_type,
            output_dimensionality: self.dimensions,
        };

        let response: EmbedResponse = self
            .transport
            .call(&self.model, "embedContent", &request)
            .await?;

        let values = response
            .embedding
            .ok_or(ProviderError::MissingEmbedding)?
            .values;

        if values.len() != self.dimensions {
            return Err(ProviderError::InvalidDimensions {
                expected: self.dimensions,
                actual: values.len(),
            });
        }

        Ok(values)
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        self.embed_with_task(text, TaskType::RetrievalDocument)
            .await
            .map(Some)
    }

    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        self.embed_with_task(text, TaskType::RetrievalQuery)
            .await
            .map(Some)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Wraps [`GeminiEmbeddingClient`]. On any error, logs a warning and returns
/// `Ok(None)` so callers treat the text as unembeddable rather than failing.
pub struct FallbackEmbeddingClient {
    inner: GeminiEmbeddingClient,
}

impl FallbackEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            inner: GeminiEmbeddingClient::new(config)?,
        })
    }

    pub fn with_base_url(config: EmbeddingConfig, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            inner: GeminiEmbeddingClient::with_base_url(config, base_url)?,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for FallbackEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        match self.inner.embed_with_task(text, TaskType::RetrievalDocument).await {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini embedding failed, continuing without a vector");
                Ok(None)
            }
        }
    }

    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        match self.inner.embed_with_task(text, TaskType::RetrievalQuery).await {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini query embedding failed, skipping local search");
                Ok(None)
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn name(&self) -> &str {
        "gemini-fallback"
    }

    fn model(&self) -> &str {
        &self.inner.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_config(api_key: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: api_key.to_string(),
            model: GEMINI_EMBEDDING_MODEL.to_string(),
            dimensions: GEMINI_DIMENSIONS,
            retry: RetryPolicy {
                max_retries: 2,
                retry_delay_ms: 2,
            },
        }
    }

    fn vector_body() -> serde_json::Value {
        let values: Vec<f32> = (0..GEMINI_DIMENSIONS).map(|i| i as f32 * 0.001).collect();
        serde_json::json!({
            "embedding": {
                "values": values
            }
        })
    }

    #[tokio::test]
    async fn test_embed_document_sends_document_task_type() {
        let server = MockServer::start().await;
        let client = GeminiEmbeddingClient::with_base_url(gemini_config("test-api-key"), server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "model": "models/text-embedding-004",
                "content": { "parts": [{ "text": "Drug: Ibuprofen | Class: NSAID" }] },
                "taskType": "RETRIEVAL_DOCUMENT",
                "outputDimensionality": 768
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector_body()))
            .mount(&server)
            .await;

        let embedding = client
            .embed("Drug: Ibuprofen | Class: NSAID")
            .await
            .expect("embed should succeed")
            .expect("gemini always returns a vector");
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn test_embed_query_sends_query_task_type() {
        let server = MockServer::start().await;
        let client = GeminiEmbeddingClient::with_base_url(gemini_config("k"), server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "model": "models/text-embedding-004",
                "content": { "parts": [{ "text": "what is migraine" }] },
                "taskType": "RETRIEVAL_QUERY",
                "outputDimensionality": 768
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector_body()))
            .expect(1)
            .mount(&server)
            .await;

        let result = client.embed_query("what is migraine").await.unwrap();
        assert_eq!(result.map(|v| v.len()), Some(768));
    }

    #[tokio::test]
    async fn test_rate_limited_call_is_retried() {
        let server = MockServer::start().await;
        let client = GeminiEmbeddingClient::with_base_url(gemini_config("k"), server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "quota" }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector_body()))
            .mount(&server)
            .await;

        let embedding = client.embed_with_task("hello", TaskType::RetrievalDocument).await;
        assert!(embedding.is_ok(), "Expected success after retry: {:?}", embedding.err());
    }

    #[tokio::test]
    async fn test_short_vector_is_rejected() {
        let server = MockServer::start().await;
        let client = GeminiEmbeddingClient::with_base_url(gemini_config("k"), server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": [0.1, 0.2, 0.3] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        match client.embed("hello").await {
            Err(ProviderError::InvalidDimensions { expected, actual }) => {
                assert_eq!(expected, 768);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected InvalidDimensions, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_missing_embedding_field() {
        let server = MockServer::start().await;
        let client = GeminiEmbeddingClient::with_base_url(gemini_config("k"), server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        assert!(matches!(
            client.embed("hello").await,
            Err(ProviderError::MissingEmbedding)
        ));
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            GeminiEmbeddingClient::new(gemini_config("")),
            Err(ProviderError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_fallback_swallows_server_errors() {
        let server = MockServer::start().await;
        let mut config = gemini_config("k");
        config.retry.max_retries = 0;
        let fallback = FallbackEmbeddingClient::with_base_url(config, server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "code": 500, "message": "boom" }
            })))
            .mount(&server)
            .await;

        let result = fallback.embed("Drug: Warfarin").await;
        assert!(matches!(result, Ok(None)));
        assert!(fallback.embed_query("hello").await.unwrap().is_none());
        assert_eq!(fallback.name(), "gemini-fallback");
        assert_eq!(fallback.model(), GEMINI_EMBEDDING_MODEL);
    }

    #[test]
    fn test_factory_builds_hashing_backend_without_key() {
        let backend = create_backend(BackendConfig::Hashing { dimensions: 64 }).unwrap();
        assert_eq!(backend.name(), "hashing");
        assert_eq!(backend.dimensions(), 64);
    }
}
