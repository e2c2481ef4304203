//! Binary-vector store: f32 little-endian BLOB column with cosine distance
//! pushed down into the engine through a registered scalar function.

use crate::error::{Result, VecSearchError};
use crate::search::cosine_similarity;
use crate::storage::{BackendKind, Candidate, DbPool, EmbeddingStore, NewEmbedding, StoredEmbedding};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};

/// Register `embedding_distance(a, b)` on a connection.
///
/// Both arguments are f32-LE blobs; the result is cosine distance
/// (`1 - similarity`), or NULL when either blob is malformed or the
/// dimensions differ, so mismatched rows drop out of queries in SQL.
pub(crate) fn register_distance_function(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "embedding_distance",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a = decode_vector(ctx.get_raw(0).as_blob()?);
            let b = decode_vector(ctx.get_raw(1).as_blob()?);

            let distance: Option<f64> = match (a, b) {
                (Some(a), Some(b)) if a.len() == b.len() => {
                    Some(1.0 - cosine_similarity(&a, &b) as f64)
                }
                _ => None,
            };
            Ok(distance)
        },
    )
}

/// Encode a vector as little-endian f32 bytes
pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes; `None` if the length is not a multiple
/// of four
pub(crate) fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Embedding store over the binary BLOB encoding
pub struct VectorStore {
    pool: DbPool,
    dimension: usize,
}

impl VectorStore {
    pub fn new(pool: DbPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            VecSearchError::StorageUnavailable(format!("Failed to get connection: {}", e))
        })
    }
}

impl EmbeddingStore for VectorStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Vector
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
                encode_vector(&record.embedding),
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
            let bytes: Vec<u8> = row.get(2)?;

            // Undecodable rows are stale foreign data; skip, never error
            if let Some(embedding) = decode_vector(&bytes) {
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
        let query_blob = encode_vector(query);
        let conn = self.conn()?;

        // Distance, threshold, ordering, and limit all run inside the
        // engine; NULL distances (dimension mismatch) drop out in SQL.
        // Secondary rowid ordering keeps ties in stored order.
        fn collect(mut rows: rusqlite::Rows<'_>) -> Result<Vec<Candidate>> {
            let mut candidates = Vec::new();
            while let Some(row) = rows.next()? {
                candidates.push(Candidate {
                    item_id: row.get(0)?,
                    content_text: row.get(1)?,
                    distance: row.get::<_, f64>(2)? as f32,
                });
            }
            Ok(candidates)
        }

        match max_distance {
            Some(max_distance) => {
                let mut stmt = conn.prepare(
                    "SELECT item_id, content_text,
                            embedding_distance(embedding, ?1) AS distance
                     FROM item_embeddings
                     WHERE embedding_distance(embedding, ?1) IS NOT NULL
                       AND embedding_distance(embedding, ?1) <= ?2
                     ORDER BY distance ASC, rowid ASC
                     LIMIT ?3",
                )?;
                let rows =
                    stmt.query(params![query_blob, max_distance as f64, limit as i64])?;
                collect(rows)
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT item_id, content_text,
                            embedding_distance(embedding, ?1) AS distance
                     FROM item_embeddings
                     WHERE embedding_distance(embedding, ?1) IS NOT NULL
                     ORDER BY distance ASC, rowid ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query(params![query_blob, limit as i64])?;
                collect(rows)
            }
        }
    }
}
