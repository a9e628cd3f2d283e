//! Local vector index provider wrapping the SQLite collection
//!
//! SQLite calls are blocking, so each operation runs on the blocking pool.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::VectorDbConfig;
use crate::error::Result;
use crate::storage::SqliteVectorIndex;
use crate::types::{IndexEntry, IndexStats, ScoredEntry};

use super::vector_index::VectorIndex;

/// Local vector index over `SqliteVectorIndex`
#[derive(Debug, Clone)]
pub struct LocalVectorIndex {
    store: Arc<SqliteVectorIndex>,
}

impl LocalVectorIndex {
    /// Create from an existing store
    pub fn new(store: Arc<SqliteVectorIndex>) -> Self {
        Self { store }
    }

    /// Open the configured collection
    pub fn open(config: &VectorDbConfig, dimensions: usize) -> Result<Self> {
        Self::open_at(&config.storage_path, &config.collection, dimensions)
    }

    /// Open a collection at an explicit path
    pub fn open_at(path: &Path, collection: &str, dimensions: usize) -> Result<Self> {
        let store = SqliteVectorIndex::open(path, collection, dimensions)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Underlying store for direct access
    pub fn inner(&self) -> &Arc<SqliteVectorIndex> {
        &self.store
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        let store = self.store.clone();
        let entries = entries.to_vec();
        tokio::task::spawn_blocking(move || store.upsert(&entries)).await?
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        let store = self.store.clone();
        let query = query.to_vec();
        tokio::task::spawn_blocking(move || store.search(&query, k)).await?
    }

    async fn truncate_article(&self, article_id: &str, keep: u32) -> Result<usize> {
        let store = self.store.clone();
        let article_id = article_id.to_string();
        tokio::task::spawn_blocking(move || store.truncate_article(&article_id, keep)).await?
    }

    async fn stats(&self) -> Result<IndexStats> {
        // Served from the in-memory mirror, no disk access
        Ok(self.store.stats())
    }

    async fn clear(&self) -> Result<usize> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear()).await?
    }

    fn dimensions(&self) -> usize {
        self.store.dimensions()
    }

    fn name(&self) -> &str {
        "local-sqlite"
    }
}
