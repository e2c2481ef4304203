//! Direct client for an OpenAI-compatible embeddings endpoint
//!
//! Inputs are sanitized before the request (control characters stripped,
//! whitespace collapsed, length capped to respect token limits). Inputs that
//! sanitize to empty never reach the API; they get an all-zero vector at
//! their output position so batch order is preserved without failing the
//! whole batch. Oversized batches are split into sequential sub-batches.

use super::{check_dimension, EmbeddingError, EmbeddingProvider, ProviderHealth};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Per-request input cap of the embeddings endpoint
const MAX_INPUTS_PER_REQUEST: usize = 2048;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for the direct-API variant
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    batch_timeout: Duration,
    max_input_chars: usize,
}

impl OpenAiProvider {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        batch_timeout: Duration,
        max_input_chars: usize,
    ) -> Result<Self, EmbeddingError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(EmbeddingError::Misconfigured(
                "API key is not configured".to_string(),
            ));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbeddingError::Misconfigured("Invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Unavailable(format!("HTTP client init failed: {}", e)))?;

        let endpoint = format!("{}/embeddings", base_url.trim().trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            dimension,
            timeout,
            batch_timeout,
            max_input_chars,
        })
    }

    /// One request against the embeddings endpoint; inputs must be non-empty
    /// and within the per-request cap
    fn request(
        &self,
        inputs: &[String],
        timeout: Duration,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&request)
            .send()
            .map_err(|e| EmbeddingError::Unavailable(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Unavailable(format!(
                "Embeddings endpoint returned {}",
                status
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().map_err(|e| {
            EmbeddingError::Unavailable(format!("Malformed embeddings response: {}", e))
        })?;

        // The API does not guarantee response order
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::Unavailable(format!(
                "Embedding count mismatch: expected {}, got {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|e| e.embedding).collect();
        for vector in &vectors {
            check_dimension(vector, self.dimension)?;
        }

        Ok(vectors)
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let sanitized = sanitize_input(text, self.max_input_chars);
        if sanitized.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let vectors = self.request(&[sanitized], self.timeout)?;
        vectors.into_iter().next().ok_or_else(|| {
            EmbeddingError::Unavailable("Embeddings response was empty".to_string())
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Sanitize up front; empty inputs are held out and substituted with
        // a zero vector so output positions line up with input positions.
        let sanitized: Vec<String> = texts
            .iter()
            .map(|t| sanitize_input(t, self.max_input_chars))
            .collect();

        let valid: Vec<String> = sanitized.iter().filter(|t| !t.is_empty()).cloned().collect();

        debug!(
            batch_size = texts.len(),
            valid = valid.len(),
            "Requesting batch embeddings"
        );

        let mut embedded = Vec::with_capacity(valid.len());
        for chunk in valid.chunks(MAX_INPUTS_PER_REQUEST) {
            embedded.extend(self.request(chunk, self.batch_timeout)?);
        }

        let mut embedded = embedded.into_iter();
        let mut results = Vec::with_capacity(sanitized.len());
        for text in &sanitized {
            if text.is_empty() {
                results.push(vec![0.0; self.dimension]);
            } else {
                let vector = embedded.next().ok_or_else(|| {
                    EmbeddingError::Unavailable("Embeddings response was truncated".to_string())
                })?;
                results.push(vector);
            }
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn health(&self) -> Result<ProviderHealth, EmbeddingError> {
        // No cheap health endpoint on the API; a constructed client implies
        // a configured key, so report readiness from local state only.
        Ok(ProviderHealth {
            model: self.model.clone(),
            dimensions: self.dimension,
            ready: true,
        })
    }
}

/// Sanitize one input for the embeddings endpoint: replace control
/// characters with spaces, collapse whitespace runs, cap length at a char
/// boundary.
pub fn sanitize_input(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        collapsed.chars().take(max_chars).collect()
    }
}
