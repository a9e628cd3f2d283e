//! Vector index trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{IndexEntry, IndexStats, ScoredEntry};

/// Trait for a persistent, named collection of index entries
///
/// Entries are keyed by (article id, chunk index). Similarity is cosine.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert entries, overwriting any with the same key
    ///
    /// Returns the number of entries written. Durable once this returns.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Top `k` entries by non-increasing similarity
    ///
    /// Returns fewer than `k` when the collection is smaller, and nothing
    /// for `k == 0`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredEntry>>;

    /// Drop an article's chunks with index >= `keep`
    async fn truncate_article(&self, article_id: &str, keep: u32) -> Result<usize>;

    /// Collection statistics
    async fn stats(&self) -> Result<IndexStats>;

    /// Number of entries
    async fn len(&self) -> Result<usize> {
        Ok(self.stats().await?.entry_count)
    }

    /// True if the collection holds no entries
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every entry, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    /// Vector dimensionality of the collection
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}
