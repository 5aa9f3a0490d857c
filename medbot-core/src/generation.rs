//! Text generation provider
//!
//! [`GenerationBackend`] is an opaque prompt → text call. The Gemini implementation
//! hits `generateContent` and concatenates the text parts of the first candidate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::gemini::{GeminiTransport, ProviderError, RetryPolicy};

/// Default Gemini generation model
pub const GEMINI_GENERATION_MODEL: &str = "gemini-2.0-flash-lite";

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<SamplingConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SamplingConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Calls the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGenerationClient {
    transport: GeminiTransport,
    model: String,
    temperature: Option<f32>,
}

impl GeminiGenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self, ProviderError> {
        let transport = GeminiTransport::new(config.api_key, config.retry)?;
        Ok(Self {
            transport,
            model: config.model,
            temperature: config.temperature,
        })
    }

    pub fn with_base_url(config: GenerationConfig, base_url: String) -> Result<Self, ProviderError> {
        let transport = GeminiTransport::with_base_url(config.api_key, config.retry, base_url)?;
        Ok(Self {
            transport,
            model: config.model,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationBackend for GeminiGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: self.temperature.map(|temperature| SamplingConfig { temperature }),
        };

        let response: GenerateResponse = self
            .transport
            .call(&self.model, "generateContent", &request)
            .await?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Err(ProviderError::EmptyCompletion { reason: None });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyCompletion {
                reason: candidate.finish_reason,
            });
        }

        tracing::debug!(model = %self.model, chars = text.len(), "Generated completion");
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
