//! JSON-fallback store: embeddings serialized as JSON arrays in a TEXT
//! column, nearest-neighbor queries answered by a full in-process scan.
//! O(N) per query is the expected behavior of this backend, not a
//! degradation to fix.

use crate::error::{Result, VecSearchError};
use crate::search::{cosine_similarity, rank_by_distance};
use crate::storage::{BackendKind, Candidate, DbPool, EmbeddingStore, NewEmbedding, StoredEmbedding};
use rusqlite::{params, OptionalExtension};

/// Embedding store over the JSON text encoding
pub struct JsonStore {
    pool: DbPool,
    dimension: usize,
}

impl JsonStore {
    pub fn new(pool: DbPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            VecSearchError::StorageUnavailable(format!("Failed to get connection: {}", e))
        })
    }
}

impl EmbeddingStore for JsonStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Json
    }

    fn exists(&self, item_id: &str, content_hash: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM item_embeddings WHERE item_id = ?1 AND content_hash = ?2 LIMIT 1",
                params![item_id, content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert(&self, record: &NewEmbedding) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(VecSearchError::DimensionMismatch {
                expected: self.dimension,
                actual: record.embedding.len(),
            });
        }

        let encoded =
            serde_json::to_string(&record.embedding).map_err(|e| VecSearchError::Json {
                source: e,
                context: "Failed to encode embedding".to_string(),
            })?;

        let now = chrono::Utc::now().timestamp();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO item_embeddings
                 (id, item_id, item_version_id, embedding, content_hash,
                  content_text, embedding_model, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (item_id, item_version_id) DO UPDATE SET
                 embedding = excluded.embedding,
                 content_hash = excluded.content_hash,
                 content_text = excluded.content_text,
                 embedding_model = excluded.embedding_model,
                 updated_at = excluded.updated_at",
            params![
                uuid::Uuid::new_v4().to_string(),
                record.item_id,
                record.item_version_id,
                encoded,
                record.content_hash,
                record.content_text,
                record.embedding_model,
                now,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, item_id: &str, item_version_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM item_embeddings WHERE item_id = ?1 AND item_version_id = ?2",
            params![item_id, item_version_id],
        )?;
        Ok(())
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM item_embeddings", [])?;
        Ok(deleted)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM item_embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn scan(&self, visit: &mut dyn FnMut(StoredEmbedding) -> Result<()>) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, content_text, embedding FROM item_embeddings ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let item_id: String = row.get(0)?;
            let content_text: String = row.get(1)?;
            let encoded: String = row.get(2)?;

            // Unparseable rows are stale foreign data; skip, never error
            if let Ok(embedding) = serde_json::from_str::<Vec<f32>>(&encoded) {
                visit(StoredEmbedding {
                    item_id,
                    content_text,
                    embedding,
                })?;
            }
        }

        Ok(())
    }

    fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        max_distance: Option<f32>,
    ) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();

        self.scan(&mut |stored| {
            // Stale/foreign-model rows are silently excluded from ranking
            if stored.embedding.len() != query.len() {
                return Ok(());
            }
            let distance = 1.0 - cosine_similarity(query, &stored.embedding);
            candidates.push(Candidate {
                item_id: stored.item_id,
                content_text: stored.content_text,
                distance,
            });
            Ok(())
        })?;

        Ok(rank_by_distance(candidates, limit, max_distance))
    }
}
