//! Embedding provider abstraction
//!
//! Two provider variants share one semantic contract: a local/remote
//! embedding service (`/embed` + `/embed/batch`) and a direct
//! OpenAI-compatible API. Configuration selects the implementation once at
//! construction; call sites only see the trait.

mod openai;
mod service;

pub use openai::{sanitize_input, OpenAiProvider};
pub use service::HttpEmbeddingProvider;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider unreachable, timed out, or answered non-2xx / malformed body
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),

    /// Missing service URL or API key
    #[error("Embedding provider misconfigured: {0}")]
    Misconfigured(String),

    /// Caller-side bad input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Returned vector length differs from the model dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Diagnostic health report for a provider (not used by core algorithms)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub model: String,
    pub dimensions: usize,
    pub ready: bool,
}

/// Trait for embedding providers
///
/// Both operations are blocking calls with bounded timeouts. `embed_batch`
/// must return exactly one vector per input text, in input order, or fail
/// the whole call.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts (order-preserving)
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Diagnostic health probe
    fn health(&self) -> Result<ProviderHealth, EmbeddingError>;
}

/// Verify a returned vector matches the expected dimension
pub(crate) fn check_dimension(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
