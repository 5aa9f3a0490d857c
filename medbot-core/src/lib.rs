pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod hashing_embedder;
pub mod index;
pub mod intent;
pub mod models;
pub mod projector;
pub mod prompts;
pub mod protocol;
pub mod rank;

pub use config::MedbotConfig;
pub use corpus::Corpus;
pub use embeddings::{
    create_backend, BackendConfig, EmbeddingBackend, EmbeddingConfig, FallbackEmbeddingClient,
    GeminiEmbeddingClient, GEMINI_DIMENSIONS, GEMINI_EMBEDDING_MODEL,
};
pub use error::MedbotError;
pub use gemini::{ProviderError, RetryPolicy};
pub use generation::{GeminiGenerationClient, GenerationBackend, GenerationConfig};
pub use hashing_embedder::HashingEmbeddingClient;
pub use index::{EmbeddingCache, IndexEntry, SemanticIndex};
pub use intent::{classify, extract_entity_name, Intent};
pub use models::{Conversation, EntityKind, Record, Role};
