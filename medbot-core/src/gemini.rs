//! Shared HTTP plumbing for the Gemini REST API
//!
//! Both the embedding and the generation clients POST JSON to
//! `{base}/models/{model}:{method}` and share one retry policy: transient failures
//! (transport errors, 429, 5xx) are retried with jittered exponential backoff, anything
//! else is returned on the first attempt.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Errors raised by any provider backend (embedding or generation).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response: expected {expected} dimensions, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    #[error("Missing embedding in response")]
    MissingEmbedding,

    #[error("Model returned no text (finish reason: {})", .reason.as_deref().unwrap_or("unknown"))]
    EmptyCompletion { reason: Option<String> },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

// The URL is stripped so a request target can never reach logs or reply text.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.without_url())
    }
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => !e.is_decode() && !e.is_builder(),
            ProviderError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Bounded retry settings for provider calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// First backoff delay; each further delay doubles, capped at 10s.
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor((self.retry_delay_ms / 2).max(1))
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.max_retries)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

/// Authenticated JSON transport to one Gemini endpoint root.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiTransport {
    pub fn new(api_key: String, retry: RetryPolicy) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, retry, DEFAULT_BASE_URL.to_string())
    }

    /// Point the transport at another root (mock servers, proxies).
    pub fn with_base_url(
        api_key: String,
        retry: RetryPolicy,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// POST `body` to `models/{model}:{method}` with retry, decoding the JSON reply.
    pub async fn call<Req, Resp>(
        &self,
        model: &str,
        method: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let result = RetryIf::spawn(
            self.retry.strategy(),
            || self.call_once(model, method, body),
            |e: &ProviderError| {
                let retry = e.is_transient();
                if retry {
                    tracing::warn!(model, method, error = %e, "Transient Gemini error, retrying");
                }
                retry
            },
        )
        .await;

        match result {
            Ok(resp) => Ok(resp),
            Err(e) if e.is_transient() => {
                tracing::error!(
                    attempts = self.retry.attempts(),
                    model,
                    method,
                    error = %e,
                    "All Gemini retry attempts failed"
                );
                Err(ProviderError::RetryExhausted {
                    attempts: self.retry.attempts(),
                    last: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn call_once<Req, Resp>(
        &self,
        model: &str,
        method: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = format!("{}/models/{}:{}", self.base_url, model, method);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let (code, message) = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::debug!(code, message = %message, "Gemini API error");
            return Err(ProviderError::Api { code, message });
        }

        Ok(response.json().await?)
    }
}
