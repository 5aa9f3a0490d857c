//! Offline embedding backend
//!
//! Feature hashing over lower-cased word tokens: each token is hashed with blake3
//! into one of `dimensions` buckets with a ±1 sign, and the result is L2-normalized.
//! Identical texts always produce identical vectors, and texts sharing words score
//! higher than unrelated ones. No network access, so it backs offline runs and tests.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::embeddings::EmbeddingBackend;
use crate::gemini::ProviderError;

/// Default bucket count for the hashing backend
pub const HASHING_DIMENSIONS: usize = 256;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static token pattern"))
}

#[derive(Debug, Clone)]
pub struct HashingEmbeddingClient {
    dimensions: usize,
    /// Bucket count is part of the identity: vectors of different widths never mix.
    model: String,
}

impl HashingEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("feature-hashing-v1-{}", dimensions),
        }
    }

    /// Deterministic vector for `text`. All-zero when the text has no word tokens.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for token in token_pattern().find_iter(&lowered) {
            let hash = blake3::hash(token.as_str().as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbeddingClient {
    fn default() -> Self {
        Self::new(HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingBackend for HashingEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        Ok(Some(self.vectorize(text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
