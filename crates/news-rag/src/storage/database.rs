//! SQLite-backed vector index with an in-memory search mirror
//!
//! Entries are written through to SQLite inside a transaction and mirrored in
//! memory for exhaustive cosine search. The mirror is only updated after a
//! successful commit, so it never holds anything that is not durable.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{EntryMetadata, IndexEntry, IndexStats, ScoredEntry};

/// Similarity metric reported in stats
pub const METRIC: &str = "cosine";

type EntryKey = (String, u32);

/// Mirrored entry with its precomputed norm
#[derive(Debug, Clone)]
struct StoredEntry {
    entry: IndexEntry,
    norm: f32,
}

/// Persistent vector collection stored in SQLite
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    collection: String,
    dimensions: usize,
    entries: RwLock<BTreeMap<EntryKey, StoredEntry>>,
}

impl std::fmt::Debug for SqliteVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorIndex")
            .field("collection", &self.collection)
            .field("dimensions", &self.dimensions)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl SqliteVectorIndex {
    /// Create or open a collection in the database at `path`
    ///
    /// Fails with a configuration error if the path cannot be opened or the
    /// collection already exists with a different dimensionality.
    pub fn open<P: AsRef<Path>>(path: P, collection: &str, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "Cannot create storage directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::Config(format!("Cannot open vector index {}: {}", path.display(), e))
        })?;

        let index = Self::with_connection(conn, collection, dimensions)?;
        tracing::info!(
            path = %path.display(),
            collection,
            dimensions,
            entries = index.entries.read().len(),
            "Vector index opened"
        );
        Ok(index)
    }

    /// Create an in-memory index (for testing)
    #[cfg(test)]
    pub fn in_memory(collection: &str, dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Config(format!("Failed to open in-memory database: {}", e)))?;
        Self::with_connection(conn, collection, dimensions)
    }

    fn with_connection(conn: Connection, collection: &str, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("vector index dimensions must be positive"));
        }

        let index = Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            dimensions,
            entries: RwLock::new(BTreeMap::new()),
        };

        index.migrate()?;
        index.ensure_collection()?;
        index.load()?;
        Ok(index)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // FULL sync: an upsert is durable once it returns
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=FULL;
            PRAGMA temp_store=MEMORY;
            "#,
        )
        .map_err(|e| Error::VectorDb(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                metric TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS index_entries (
                collection TEXT NOT NULL,
                article_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                url TEXT NOT NULL,
                published_at TEXT,
                vector BLOB NOT NULL,
                PRIMARY KEY (collection, article_id, chunk_index)
            );
            "#,
        )
        .map_err(|e| Error::VectorDb(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Register the collection or check its recorded dimensionality
    fn ensure_collection(&self) -> Result<()> {
        let conn = self.conn.lock();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![self.collection],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(dims) if dims as usize != self.dimensions => Err(Error::Config(format!(
                "Collection '{}' stores {}-dimensional vectors but the embedder produces {}",
                self.collection, dims, self.dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT INTO collections (name, dimensions, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![self.collection, self.dimensions as i64, METRIC, Utc::now()],
                )?;
                tracing::debug!(collection = %self.collection, "Collection created");
                Ok(())
            }
        }
    }

    /// Populate the in-memory mirror from disk
    fn load(&self) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT article_id, chunk_index, text, title, source, url, published_at, vector
            FROM index_entries WHERE collection = ?1
            "#,
        )?;

        let rows = stmt.query_map(params![self.collection], |row| {
            Ok((
                EntryMetadata {
                    article_id: row.get(0)?,
                    chunk_index: row.get::<_, i64>(1)? as u32,
                    title: row.get(3)?,
                    source: row.get(4)?,
                    url: row.get(5)?,
                    published_at: row.get::<_, Option<DateTime<Utc>>>(6)?,
                },
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(7)?,
            ))
        })?;

        let mut entries = self.entries.write();
        entries.clear();
        for row in rows {
            let (metadata, text, blob) = row?;
            let vector = blob_to_vector(&blob)?;
            if vector.len() != self.dimensions {
                return Err(Error::VectorDb(format!(
                    "Stored entry ({}, {}) has {} dimensions, collection has {}",
                    metadata.article_id,
                    metadata.chunk_index,
                    vector.len(),
                    self.dimensions
                )));
            }
            let entry = IndexEntry {
                vector,
                text,
                metadata,
            };
            entries.insert(entry.key(), StoredEntry::new(entry));
        }
        Ok(())
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Vector dimensionality
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Insert entries, overwriting by (article id, chunk index)
    ///
    /// All-or-nothing: one transaction per call.
    pub fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        for entry in entries {
            self.check_dimensions(entry.vector.len())?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO index_entries (
                    collection, article_id, chunk_index, text, title, source, url,
                    published_at, vector
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(collection, article_id, chunk_index) DO UPDATE SET
                    text = excluded.text,
                    title = excluded.title,
                    source = excluded.source,
                    url = excluded.url,
                    published_at = excluded.published_at,
                    vector = excluded.vector
                "#,
            )?;

            for entry in entries {
                let meta = &entry.metadata;
                stmt.execute(params![
                    self.collection,
                    meta.article_id,
                    meta.chunk_index as i64,
                    entry.text,
                    meta.title,
                    meta.source,
                    meta.url,
                    meta.published_at,
                    vector_to_blob(&entry.vector),
                ])?;
            }
        }
        tx.commit()?;

        // Still holding the connection lock, so writers apply in commit order
        let mut mirror = self.entries.write();
        for entry in entries {
            mirror.insert(entry.key(), StoredEntry::new(entry.clone()));
        }

        tracing::debug!(
            collection = %self.collection,
            written = entries.len(),
            total = mirror.len(),
            "Upserted entries"
        );
        Ok(entries.len())
    }

    /// Exhaustive cosine search
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        self.check_dimensions(query.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &EntryKey, &StoredEntry)> = entries
            .iter()
            .map(|(key, stored)| (cosine(query, query_norm, stored), key, stored))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(similarity, _, stored)| ScoredEntry {
                entry: stored.entry.clone(),
                similarity,
            })
            .collect())
    }

    /// Delete an article's chunks with index >= `keep`
    pub fn truncate_article(&self, article_id: &str, keep: u32) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM index_entries WHERE collection = ?1 AND article_id = ?2 AND chunk_index >= ?3",
            params![self.collection, article_id, keep as i64],
        )?;

        if removed > 0 {
            self.entries
                .write()
                .retain(|(id, idx), _| !(id == article_id && *idx >= keep));
            tracing::debug!(article_id, removed, "Pruned stale chunks");
        }
        Ok(removed)
    }

    /// Remove every entry in the collection
    ///
    /// The collection itself, and its dimensionality, remain registered.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM index_entries WHERE collection = ?1",
            params![self.collection],
        )?;
        self.entries.write().clear();

        tracing::info!(collection = %self.collection, removed, "Collection cleared");
        Ok(removed)
    }

    /// Collection statistics
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            collection: self.collection.clone(),
            entry_count: self.len(),
            dimensions: self.dimensions,
            metric: METRIC.to_string(),
        }
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.dimensions {
            return Err(Error::Config(format!(
                "Vector has {} dimensions, collection '{}' expects {}",
                len, self.collection, self.dimensions
            )));
        }
        Ok(())
    }
}

impl StoredEntry {
    fn new(entry: IndexEntry) -> Self {
        let norm = l2_norm(&entry.vector);
        Self { entry, norm }
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; zero vectors score 0
fn cosine(query: &[f32], query_norm: f32, stored: &StoredEntry) -> f32 {
    if query_norm == 0.0 || stored.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query
        .iter()
        .zip(&stored.entry.vector)
        .map(|(a, b)| a * b)
        .sum();
    (dot / (query_norm * stored.norm)).clamp(-1.0, 1.0)
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::VectorDb(format!(
            "Corrupt vector blob of {} bytes",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
