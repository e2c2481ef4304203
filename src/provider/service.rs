//! HTTP client for a local/remote embedding service
//!
//! The service speaks a minimal JSON contract: `POST /embed` with `{"text"}`
//! returns `{"embedding"}`, `POST /embed/batch` with `{"texts"}` returns
//! `{"embeddings"}` in input order, `GET /health` reports model readiness.
//! Any non-200 status or malformed body fails the whole call.

use super::{check_dimension, EmbeddingError, EmbeddingProvider, ProviderHealth};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct EmbedBatchRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct HealthResponse {
    model: String,
    dimensions: usize,
    ready: bool,
}

/// Blocking client for the embedding service variant
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    batch_timeout: Duration,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        batch_timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EmbeddingError::Misconfigured(
                "Embedding service URL is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| EmbeddingError::Unavailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            model: model.to_string(),
            dimension,
            timeout,
            batch_timeout,
        })
    }

    fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<reqwest::blocking::Response, EmbeddingError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .map_err(|e| EmbeddingError::Unavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(EmbeddingError::Unavailable(format!(
                "Embedding service error: {} returned {}",
                url, status
            )));
        }

        Ok(response)
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        debug!(text_len = text.len(), "Requesting single embedding");

        let response = self.post_json("/embed", &EmbedRequest { text }, self.timeout)?;
        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::Unavailable(format!("Malformed embed response: {}", e)))?;

        check_dimension(&parsed.embedding, self.dimension)?;
        Ok(parsed.embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), "Requesting batch embeddings");

        let response = self.post_json(
            "/embed/batch",
            &EmbedBatchRequest { texts },
            self.batch_timeout,
        )?;
        let parsed: EmbedBatchResponse = response.json().map_err(|e| {
            EmbeddingError::Unavailable(format!("Malformed batch embed response: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Unavailable(format!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        for embedding in &parsed.embeddings {
            check_dimension(embedding, self.dimension)?;
        }

        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn health(&self) -> Result<ProviderHealth, EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .map_err(|e| EmbeddingError::Unavailable(format!("{}: {}", url, e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(EmbeddingError::Unavailable(format!(
                "Health check returned {}",
                response.status()
            )));
        }

        let parsed: HealthResponse = response.json().map_err(|e| {
            EmbeddingError::Unavailable(format!("Malformed health response: {}", e))
        })?;

        Ok(ProviderHealth {
            model: parsed.model,
            dimensions: parsed.dimensions,
            ready: parsed.ready,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let result = HttpEmbeddingProvider::new(
            "  ",
            "test-model",
            8,
            Duration::from_secs(5),
            Duration::from_secs(10),
        );
        assert!(matches!(result, Err(EmbeddingError::Misconfigured(_))));
    }

    #[test]
    fn trims_trailing_slash() {
        let provider = HttpEmbeddingProvider::new(
            "http://localhost:8001/",
            "test-model",
            8,
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(provider.base_url, "http://localhost:8001");
    }

    #[test]
    fn empty_text_is_invalid_input() {
        let provider = HttpEmbeddingProvider::new(
            "http://localhost:8001",
            "test-model",
            8,
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(matches!(
            provider.embed(""),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_batch_short_circuits() {
        let provider = HttpEmbeddingProvider::new(
            "http://localhost:8001",
            "test-model",
            8,
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .unwrap();
        // No texts means no HTTP call and an empty result
        assert!(provider.embed_batch(&[]).unwrap().is_empty());
    }
}
