//! Catalog item model and paginated access
//!
//! The catalog owns item data; the indexing core only reads it. The
//! `Catalog` trait is the boundary: stable offset/limit pagination with a
//! known total. The SQLite implementation shares the embedding database so
//! the cascade from item deletion to embedding rows works in one engine.

use crate::error::{Result, VecSearchError};
use crate::storage::DbPool;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// One textual property value attached to an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// A catalog item (read-only to the indexing core)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default = "default_version")]
    pub version_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyValue>,
}

fn default_version() -> String {
    "default".to_string()
}

/// One page of catalog items plus the known total
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: usize,
}

/// Paginated, read-only catalog access
pub trait Catalog: Send + Sync {
    /// Fetch items at `offset`, at most `limit` of them, in a stable order
    fn page(&self, offset: usize, limit: usize) -> Result<ItemPage>;
}

/// Catalog stored in the shared SQLite database
pub struct SqliteCatalog {
    pool: DbPool,
}

impl SqliteCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            VecSearchError::StorageUnavailable(format!("Failed to get connection: {}", e))
        })
    }

    /// Number of items in the catalog
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert or replace items (used by the import command)
    pub fn upsert_items(&self, items: &[Item]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for item in items {
            if item.name.trim().is_empty() && item.id.trim().is_empty() {
                return Err(VecSearchError::InvalidInput(
                    "Item needs at least an id or a name".to_string(),
                ));
            }

            let categories =
                serde_json::to_string(&item.categories).map_err(|e| VecSearchError::Json {
                    source: e,
                    context: "Failed to encode item categories".to_string(),
                })?;
            let properties =
                serde_json::to_string(&item.properties).map_err(|e| VecSearchError::Json {
                    source: e,
                    context: "Failed to encode item properties".to_string(),
                })?;

            tx.execute(
                "INSERT INTO items
                     (id, version_id, name, description, manufacturer, categories, properties)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (id, version_id) DO UPDATE SET
                     name = excluded.name,
                     description = excluded.description,
                     manufacturer = excluded.manufacturer,
                     categories = excluded.categories,
                     properties = excluded.properties",
                params![
                    item.id,
                    item.version_id,
                    item.name,
                    item.description,
                    item.manufacturer,
                    categories,
                    properties,
                ],
            )?;
        }

        tx.commit()?;
        Ok(items.len())
    }
}

impl Catalog for SqliteCatalog {
    fn page(&self, offset: usize, limit: usize) -> Result<ItemPage> {
        let conn = self.conn()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT id, version_id, name, description, manufacturer, categories, properties
             FROM items
             ORDER BY id, version_id
             LIMIT ?1 OFFSET ?2",
        )?;

        let mut rows = stmt.query(params![limit as i64, offset as i64])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            let categories_raw: String = row.get(5)?;
            let properties_raw: String = row.get(6)?;

            items.push(Item {
                id: row.get(0)?,
                version_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                manufacturer: row.get(4)?,
                categories: serde_json::from_str(&categories_raw).unwrap_or_default(),
                properties: serde_json::from_str(&properties_raw).unwrap_or_default(),
            });
        }

        Ok(ItemPage {
            items,
            total: total as usize,
        })
    }
}

/// Parse items from a JSON export (array of item objects). Items without an
/// id get a generated one.
pub fn items_from_json(content: &str) -> Result<Vec<Item>> {
    #[derive(Deserialize)]
    struct RawItem {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        version_id: Option<String>,
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        manufacturer: Option<String>,
        #[serde(default)]
        categories: Vec<String>,
        #[serde(default)]
        properties: Vec<PropertyValue>,
    }

    let raw: Vec<RawItem> = serde_json::from_str(content).map_err(|e| VecSearchError::Json {
        source: e,
        context: "Failed to parse item file".to_string(),
    })?;

    Ok(raw
        .into_iter()
        .map(|r| Item {
            id: r.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            version_id: r.version_id.unwrap_or_else(default_version),
            name: r.name,
            description: r.description,
            manufacturer: r.manufacturer,
            categories: r.categories,
            properties: r.properties,
        })
        .collect())
}
