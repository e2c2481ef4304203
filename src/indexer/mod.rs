//! Indexing orchestrator
//!
//! Drives full or incremental re-indexing: pages through the catalog,
//! normalizes each item, skips unchanged content by hash unless forced,
//! batch-embeds the survivors, and writes the records through the store.
//! A failed page counts all of its items as errors and the run continues;
//! the caller always gets a structured summary.

use crate::catalog::Catalog;
use crate::content::normalize;
use crate::error::Result;
use crate::provider::EmbeddingProvider;
use crate::storage::{EmbeddingStore, NewEmbedding};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Aggregate result of one indexing run
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    /// Items the catalog reported in total
    pub total_items: usize,
    /// Records actually written
    pub indexed: usize,
    /// Items that failed (embedding or write)
    pub errors: usize,
    /// Page/batch size the run used
    pub batch_size: usize,
}

/// Single-worker indexing orchestrator. All I/O is blocking; no fan-out
/// across pages or items.
pub struct Indexer<'a> {
    catalog: &'a dyn Catalog,
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn EmbeddingStore,
}

impl<'a> Indexer<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        provider: &'a dyn EmbeddingProvider,
        store: &'a dyn EmbeddingStore,
    ) -> Self {
        Self {
            catalog,
            provider,
            store,
        }
    }

    /// Index the whole catalog in pages of `batch_size`. With `force`, the
    /// hash skip is bypassed and existing records are deleted before the
    /// fresh upsert so exactly one newly-timestamped record remains.
    pub fn run(&self, batch_size: usize, force: bool) -> Result<IndexReport> {
        info!(batch_size, force, "Starting catalog indexing");

        let mut total_items = 0;
        let mut indexed = 0;
        let mut errors = 0;
        let mut offset = 0;

        loop {
            let page = self.catalog.page(offset, batch_size)?;
            total_items = page.total;

            if page.items.is_empty() {
                break;
            }

            let (page_indexed, page_errors) = self.process_page(&page.items, force)?;
            indexed += page_indexed;
            errors += page_errors;

            offset += page.items.len();
            if offset >= page.total {
                break;
            }
        }

        info!(total_items, indexed, errors, "Catalog indexing completed");

        Ok(IndexReport {
            total_items,
            indexed,
            errors,
            batch_size,
        })
    }

    /// Index one page; returns (indexed, errors). A batch embedding failure
    /// fails every pending item on the page, not the whole run.
    fn process_page(&self, items: &[crate::catalog::Item], force: bool) -> Result<(usize, usize)> {
        let mut pending = Vec::new();

        for item in items {
            let content = normalize(item);

            if !force && self.store.exists(&item.id, &content.hash)? {
                debug!(item_id = %item.id, "Content unchanged, skipping");
                continue;
            }

            pending.push((item, content));
        }

        if pending.is_empty() {
            return Ok((0, 0));
        }

        let texts: Vec<String> = pending.iter().map(|(_, c)| c.text.clone()).collect();

        let vectors = match self.provider.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == pending.len() => vectors,
            Ok(vectors) => {
                // The provider contract is one vector per input; a short or
                // long batch fails the whole page like any other batch error
                warn!(
                    expected = pending.len(),
                    got = vectors.len(),
                    "Batch embedding count mismatch"
                );
                return Ok((0, pending.len()));
            }
            Err(e) => {
                warn!(failed = pending.len(), "Batch embedding failed: {}", e);
                return Ok((0, pending.len()));
            }
        };

        let mut indexed = 0;
        let mut errors = 0;

        for ((item, content), vector) in pending.iter().zip(vectors) {
            let record = NewEmbedding {
                item_id: item.id.clone(),
                item_version_id: item.version_id.clone(),
                embedding: vector,
                content_text: content.text.clone(),
                content_hash: content.hash.clone(),
                embedding_model: self.provider.model_name().to_string(),
            };

            let written = if force {
                self.store
                    .delete(&item.id, &item.version_id)
                    .and_then(|_| self.store.upsert(&record))
            } else {
                self.store.upsert(&record)
            };

            match written {
                Ok(()) => indexed += 1,
                Err(e) => {
                    error!(item_id = %item.id, "Failed to store embedding: {}", e);
                    errors += 1;
                }
            }
        }

        Ok((indexed, errors))
    }
}
