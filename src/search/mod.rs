//! Similarity search engine
//!
//! Stateless per call: embed the query, ask the store for the nearest
//! candidates, and apply the threshold/limit/fallback policy. Both storage
//! backends answer through the same `nearest` contract, so the policy is
//! identical regardless of where the distance math runs.

use crate::error::{Result, VecSearchError};
use crate::provider::EmbeddingProvider;
use crate::storage::{Candidate, EmbeddingStore};
use serde::Serialize;
use tracing::{debug, info};

/// When nothing meets the threshold but candidates exist, return this many
/// best-effort results instead of an empty set (capped by the caller limit).
const FALLBACK_RESULTS: usize = 3;

/// One ranked search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub item_id: String,
    pub similarity: f32,
    pub distance: f32,
    pub content_text: String,
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns exactly `0.0` when either vector has zero magnitude; never
/// NaN or Inf.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut mag_a = 0.0_f32;
    let mut mag_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Filter candidates by max distance, sort ascending (stable, so ties keep
/// their input order), truncate to `limit`. `None` disables the filter.
pub fn rank_by_distance(
    mut candidates: Vec<Candidate>,
    limit: usize,
    max_distance: Option<f32>,
) -> Vec<Candidate> {
    if let Some(max_distance) = max_distance {
        candidates.retain(|c| c.distance <= max_distance);
    }

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates.truncate(limit);
    candidates
}

/// Nearest-neighbor search over one provider + store pair
pub struct SearchEngine<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn EmbeddingStore,
}

impl<'a> SearchEngine<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, store: &'a dyn EmbeddingStore) -> Self {
        Self { provider, store }
    }

    /// Top matches for `query`, similarity descending.
    ///
    /// Candidates below `threshold` are dropped; if that empties a non-empty
    /// store, the best `min(limit, 3)` candidates are returned instead. An
    /// empty store yields an empty result, not an error.
    pub fn search(&self, query: &str, limit: usize, threshold: f32) -> Result<Vec<SearchMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VecSearchError::InvalidInput(
                "Search query must not be empty".to_string(),
            ));
        }

        info!(query, limit, threshold, "Vector search started");

        // No partial results are possible without a query vector
        let query_vector = self.provider.embed(query)?;

        let max_distance = 1.0 - threshold;
        let mut candidates = self
            .store
            .nearest(&query_vector, limit, Some(max_distance))?;

        if candidates.is_empty() && self.store.count()? > 0 {
            debug!(threshold, "No candidate met the threshold, relaxing");
            candidates = self
                .store
                .nearest(&query_vector, limit.min(FALLBACK_RESULTS), None)?;
        }

        Ok(candidates
            .into_iter()
            .map(|c| SearchMatch {
                item_id: c.item_id,
                similarity: 1.0 - c.distance,
                distance: c.distance,
                content_text: c.content_text,
            })
            .collect())
    }
}
