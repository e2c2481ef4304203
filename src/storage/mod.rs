//! Embedding storage layer
//!
//! One `EmbeddingStore` interface, two physical encodings chosen once when
//! the database is opened: a binary vector column with the distance
//! computation pushed down into the engine, or a JSON-encoded fallback that
//! is scanned in process. Both encodings round-trip f32 losslessly and must
//! produce equivalent search results.

pub mod database;
mod json;
mod vector;

pub use database::{Database, DbPool, DbStats};
pub use json::JsonStore;
pub use vector::VectorStore;

pub(crate) use vector::encode_vector;

use crate::error::Result;

/// Minimum engine version for the binary-vector backend: the registered
/// distance function relies on modern SQLite behavior verified against 3.41.
pub const MIN_VECTOR_VERSION: &str = "3.41.0";

/// Physical encoding of the embedding column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Binary f32 column, distance/threshold/ordering pushed down to SQL
    Vector,
    /// JSON text column, full in-process scan per query
    Json,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Vector => "vector",
            BackendKind::Json => "json",
        }
    }
}

/// New or replacement embedding for one item version
#[derive(Debug, Clone)]
pub struct NewEmbedding {
    pub item_id: String,
    pub item_version_id: String,
    pub embedding: Vec<f32>,
    pub content_text: String,
    pub content_hash: String,
    pub embedding_model: String,
}

/// Row yielded by a full store scan
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub item_id: String,
    pub content_text: String,
    pub embedding: Vec<f32>,
}

/// Ranked candidate returned by a nearest-neighbor query
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item_id: String,
    pub content_text: String,
    pub distance: f32,
}

/// Durable mapping from `(item_id, item_version_id)` to embedding records
pub trait EmbeddingStore: Send + Sync {
    /// Which physical encoding this store uses
    fn backend(&self) -> BackendKind;

    /// True iff a live record for the item carries exactly this hash
    fn exists(&self, item_id: &str, content_hash: &str) -> Result<bool>;

    /// Write or overwrite the record for `(item_id, item_version_id)`.
    /// Rejects vectors whose length differs from the configured dimension.
    fn upsert(&self, record: &NewEmbedding) -> Result<()>;

    /// Remove the record for one item version, if present
    fn delete(&self, item_id: &str, item_version_id: &str) -> Result<()>;

    /// Remove every record; returns the deleted count
    fn delete_all(&self) -> Result<usize>;

    /// Number of live records
    fn count(&self) -> Result<usize>;

    /// Stream every record through `visit` without collecting the whole
    /// table. A fresh call re-scans; the sequence is not restartable.
    fn scan(&self, visit: &mut dyn FnMut(StoredEmbedding) -> Result<()>) -> Result<()>;

    /// Candidates within `max_distance` of the query (cosine distance,
    /// `1 - similarity`), ordered by distance ascending, ties in stored
    /// order, truncated to `limit`. `None` disables the distance filter.
    /// Records whose dimension differs from the query are skipped.
    fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        max_distance: Option<f32>,
    ) -> Result<Vec<Candidate>>;
}

/// Pick the embedding encoding for the detected engine version
pub fn detect_backend(engine_version: &str) -> BackendKind {
    if version_at_least(engine_version, MIN_VECTOR_VERSION) {
        BackendKind::Vector
    } else {
        BackendKind::Json
    }
}

/// Open the store implementation matching the database's backend
pub fn open_store(database: &Database, dimension: usize) -> Box<dyn EmbeddingStore> {
    match database.backend() {
        BackendKind::Vector => Box::new(VectorStore::new(database.pool().clone(), dimension)),
        BackendKind::Json => Box::new(JsonStore::new(database.pool().clone(), dimension)),
    }
}

fn parse_version(version: &str) -> (u32, u32, u32) {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

fn version_at_least(version: &str, minimum: &str) -> bool {
    parse_version(version) >= parse_version(minimum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comparison() {
        assert!(version_at_least("3.41.0", "3.41.0"));
        assert!(version_at_least("3.45.1", "3.41.0"));
        assert!(version_at_least("4.0.0", "3.41.0"));
        assert!(!version_at_least("3.40.1", "3.41.0"));
        assert!(!version_at_least("3.9.2", "3.41.0"));
    }

    #[test]
    fn backend_selection_follows_version() {
        assert_eq!(detect_backend("3.45.0"), BackendKind::Vector);
        assert_eq!(detect_backend("3.35.5"), BackendKind::Json);
    }

    #[test]
    fn malformed_version_falls_back_to_json() {
        assert_eq!(detect_backend("unknown"), BackendKind::Json);
    }
}
