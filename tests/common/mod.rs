//! Shared fixtures: a deterministic offline embedding provider and
//! database helpers for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vecsearch::catalog::{Item, PropertyValue};
use vecsearch::provider::{EmbeddingError, EmbeddingProvider, ProviderHealth};

/// Deterministic embedding provider: the same text always maps to the same
/// vector, so re-embedding identical content yields similarity 1.0. Batch
/// calls are counted to assert the hash-based skip.
pub struct MockProvider {
    dimension: usize,
    batch_calls: AtomicUsize,
    single_calls: AtomicUsize,
    fixed: Mutex<HashMap<String, Vec<f32>>>,
}

impl MockProvider {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension * 4 <= 32, "derived vectors use one blake3 hash");
        Self {
            dimension,
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            fixed: Mutex::new(HashMap::new()),
        }
    }

    /// Pin an exact vector for a given text
    pub fn with_fixed(self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.fixed.lock().unwrap().get(text) {
            return vector.clone();
        }

        let digest = blake3::hash(text.as_bytes());
        let bytes = digest.as_bytes();
        (0..self.dimension)
            .map(|i| {
                let chunk = [
                    bytes[i * 4],
                    bytes[i * 4 + 1],
                    bytes[i * 4 + 2],
                    bytes[i * 4 + 3],
                ];
                let raw = u32::from_le_bytes(chunk) as f64 / u32::MAX as f64;
                (raw * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

impl EmbeddingProvider for MockProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embedding-model"
    }

    fn health(&self) -> Result<ProviderHealth, EmbeddingError> {
        Ok(ProviderHealth {
            model: "mock-embedding-model".to_string(),
            dimensions: self.dimension,
            ready: true,
        })
    }
}

/// Provider whose every call fails, for continue-on-error coverage
pub struct FailingProvider {
    dimension: usize,
}

impl FailingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for FailingProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("provider down".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("provider down".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "failing-model"
    }

    fn health(&self) -> Result<ProviderHealth, EmbeddingError> {
        Err(EmbeddingError::Unavailable("provider down".to_string()))
    }
}

/// Provider that drops the last vector of every batch, violating the
/// one-vector-per-input contract
pub struct TruncatingProvider {
    inner: MockProvider,
}

impl TruncatingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: MockProvider::new(dimension),
        }
    }
}

impl EmbeddingProvider for TruncatingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = self.inner.embed_batch(texts)?;
        vectors.pop();
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "truncating-model"
    }

    fn health(&self) -> Result<ProviderHealth, EmbeddingError> {
        self.inner.health()
    }
}

/// A simple catalog item with just a name
pub fn item(id: &str, name: &str) -> Item {
    Item {
        id: id.to_string(),
        version_id: "v1".to_string(),
        name: name.to_string(),
        description: None,
        manufacturer: None,
        categories: Vec::new(),
        properties: Vec::new(),
    }
}

/// A richer item exercising every normalized field
pub fn shoe_item() -> Item {
    Item {
        id: "shoe-1".to_string(),
        version_id: "v1".to_string(),
        name: "Red Running Shoe".to_string(),
        description: Some("<p>Lightweight mesh upper</p>".to_string()),
        manufacturer: Some("Acme".to_string()),
        categories: vec!["Shoes".to_string()],
        properties: vec![PropertyValue {
            name: "Red".to_string(),
            group: Some("Color".to_string()),
        }],
    }
}
