//! SQLite database management with migrations
//!
//! Detects engine capability once at open time, creates the schema with the
//! matching embedding column type, and hands out pooled connections with the
//! cosine-distance function pre-registered.

use crate::error::{Result, VecSearchError};
use crate::storage::{detect_backend, vector, BackendKind};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
    backend: BackendKind,
    engine_version: String,
}

impl Database {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VecSearchError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            vector::register_distance_function(conn)
        });

        let pool = Pool::builder().max_size(16).build(manager).map_err(|e| {
            VecSearchError::StorageUnavailable(format!("Failed to create connection pool: {}", e))
        })?;

        let engine_version: String = {
            let conn = pool.get().map_err(|e| {
                VecSearchError::StorageUnavailable(format!("Failed to get connection: {}", e))
            })?;
            conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?
        };

        let backend = detect_backend(&engine_version);

        tracing::info!(
            engine_version = %engine_version,
            backend = backend.as_str(),
            "Storage opened"
        );

        let db = Self {
            pool,
            backend,
            engine_version,
        };

        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            VecSearchError::StorageUnavailable(format!("Failed to get connection: {}", e))
        })
    }

    /// The shared connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Embedding encoding chosen at schema creation
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Reported engine version string
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in migrations(self.backend).iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;

        let item_count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;

        let embedding_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM item_embeddings", [], |row| row.get(0))?;

        Ok(DbStats {
            item_count: item_count as usize,
            embedding_count: embedding_count as usize,
        })
    }
}

/// Database statistics
#[derive(Debug)]
pub struct DbStats {
    pub item_count: usize,
    pub embedding_count: usize,
}

/// Database migrations (each string is one migration). The embedding column
/// type is fixed here, at schema creation, by the detected backend.
fn migrations(backend: BackendKind) -> Vec<String> {
    let embedding_type = match backend {
        BackendKind::Vector => "BLOB",
        BackendKind::Json => "TEXT",
    };

    vec![format!(
        r#"
    -- Catalog items (read-only to the indexing core)
    CREATE TABLE items (
        id TEXT NOT NULL,
        version_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        manufacturer TEXT,
        categories TEXT NOT NULL DEFAULT '[]',
        properties TEXT NOT NULL DEFAULT '[]',
        PRIMARY KEY (id, version_id)
    );

    -- Embedding records, one live row per item version
    CREATE TABLE item_embeddings (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        item_version_id TEXT NOT NULL,
        embedding {embedding_type} NOT NULL,
        content_hash TEXT NOT NULL,
        content_text TEXT NOT NULL,
        embedding_model TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (item_id, item_version_id),
        FOREIGN KEY (item_id, item_version_id)
            REFERENCES items (id, version_id) ON DELETE CASCADE
    );

    CREATE INDEX idx_embeddings_hash ON item_embeddings(content_hash);
    CREATE INDEX idx_embeddings_model ON item_embeddings(embedding_model);
    "#
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn migrations_are_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).unwrap();

        let conn = db.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, migrations(db.backend()).len() as i32);
    }

    #[test]
    fn schema_exists() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).unwrap();
        let conn = db.get_conn().unwrap();

        for table in ["items", "item_embeddings"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn foreign_keys_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).unwrap();
        let conn = db.get_conn().unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn reopening_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let _db = Database::open(&db_path).unwrap();
        }
        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.stats().unwrap().item_count, 0);
    }
}
