//! Vector search service facade
//!
//! Owns the wired-together core: database + backend-matched store, the
//! configured provider variant, and the catalog. The CLI calls these
//! operations and formats output; no core logic lives outside this module
//! and the components it delegates to.

use crate::catalog::{Item, SqliteCatalog};
use crate::config::{Config, ProviderMode};
use crate::error::{Result, VecSearchError};
use crate::indexer::{IndexReport, Indexer};
use crate::provider::{EmbeddingProvider, HttpEmbeddingProvider, OpenAiProvider};
use crate::search::{SearchEngine, SearchMatch};
use crate::storage::{open_store, Database, EmbeddingStore, MIN_VECTOR_VERSION};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Snapshot of index and provider state
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub provider_healthy: bool,
    pub total_items: usize,
    pub indexed_items: usize,
    pub backend: String,
    pub model: String,
}

/// Backend capability diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub engine_version: String,
    pub min_vector_version: String,
    pub backend: String,
    pub model: String,
    pub dimension: usize,
    pub distance_function_ok: bool,
}

pub struct VectorSearchService {
    config: Config,
    database: Database,
    catalog: SqliteCatalog,
    provider: Box<dyn EmbeddingProvider>,
    store: Box<dyn EmbeddingStore>,
}

impl VectorSearchService {
    /// Open the database, detect the storage backend, and build the
    /// configured provider variant.
    pub fn open(config: Config) -> Result<Self> {
        let database = Database::open(&config.storage.db_path)?;
        let store = open_store(&database, config.provider.dimension);
        let catalog = SqliteCatalog::new(database.pool().clone());
        let provider = build_provider(&config)?;

        info!(
            backend = store.backend().as_str(),
            mode = ?config.provider.mode,
            model = %config.provider.model,
            "Vector search service initialized"
        );

        Ok(Self {
            config,
            database,
            catalog,
            provider,
            store,
        })
    }

    /// Index the whole catalog; `batch_size` defaults from config
    pub fn index_all(&self, batch_size: Option<usize>, force: bool) -> Result<IndexReport> {
        let batch_size = batch_size.unwrap_or(self.config.indexing.batch_size);
        if batch_size == 0 {
            return Err(VecSearchError::InvalidInput(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        Indexer::new(&self.catalog, self.provider.as_ref(), self.store.as_ref())
            .run(batch_size, force)
    }

    /// Similarity search; limit and threshold default from config
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchMatch>> {
        let limit = limit.unwrap_or(self.config.search.default_limit);
        let threshold = threshold.unwrap_or(self.config.search.default_threshold);

        SearchEngine::new(self.provider.as_ref(), self.store.as_ref())
            .search(query, limit, threshold)
    }

    /// Delete every embedding record; returns the deleted count
    pub fn clear_all(&self) -> Result<usize> {
        let deleted = self.store.delete_all()?;
        info!(deleted, "Cleared embedding store");
        Ok(deleted)
    }

    /// Index and provider status for diagnostics
    pub fn status(&self) -> Result<StatusReport> {
        let provider_healthy = self
            .provider
            .health()
            .map(|h| h.ready)
            .unwrap_or(false);

        let stats = self.database.stats()?;

        Ok(StatusReport {
            provider_healthy,
            total_items: stats.item_count,
            indexed_items: stats.embedding_count,
            backend: self.store.backend().as_str().to_string(),
            model: self.config.provider.model.clone(),
        })
    }

    /// Backend capability diagnostics (the debug command)
    pub fn debug_info(&self) -> Result<DebugReport> {
        Ok(DebugReport {
            engine_version: self.database.engine_version().to_string(),
            min_vector_version: MIN_VECTOR_VERSION.to_string(),
            backend: self.store.backend().as_str().to_string(),
            model: self.config.provider.model.clone(),
            dimension: self.config.provider.dimension,
            distance_function_ok: self.check_distance_function()?,
        })
    }

    /// Load items into the catalog (import command)
    pub fn import_items(&self, items: &[Item]) -> Result<usize> {
        self.catalog.upsert_items(items)
    }

    /// Embedding record count
    pub fn indexed_count(&self) -> Result<usize> {
        self.store.count()
    }

    fn check_distance_function(&self) -> Result<bool> {
        let conn = self.database.get_conn()?;
        let probe = crate::storage::encode_vector(&[1.0, 0.0]);
        let distance: std::result::Result<f64, rusqlite::Error> = conn.query_row(
            "SELECT embedding_distance(?1, ?1)",
            [&probe],
            |row| row.get(0),
        );
        Ok(matches!(distance, Ok(d) if d.abs() < 1e-6))
    }
}

fn build_provider(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    let provider = &config.provider;
    let timeout = Duration::from_secs(provider.timeout_secs);
    let batch_timeout = Duration::from_secs(provider.batch_timeout());

    match provider.mode {
        ProviderMode::Service => Ok(Box::new(HttpEmbeddingProvider::new(
            &provider.service_url,
            &provider.model,
            provider.dimension,
            timeout,
            batch_timeout,
        )?)),
        ProviderMode::Openai => {
            let api_key = std::env::var(&provider.api_key_env).unwrap_or_default();
            Ok(Box::new(OpenAiProvider::new(
                &api_key,
                &provider.api_base_url,
                &provider.model,
                provider.dimension,
                timeout,
                batch_timeout,
                provider.max_input_chars,
            )?))
        }
    }
}
