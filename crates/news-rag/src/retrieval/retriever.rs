//! Embeds a query and searches the index

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::ScoredEntry;

/// Query-time retriever
///
/// Must share its embedding model with the indexer, otherwise query and
/// stored vectors live in different spaces.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    default_k: usize,
}

impl Retriever {
    /// Create a retriever; fails if dimensions disagree
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(Error::Config(format!(
                "Query embedder produces {} dimensions but the index expects {}",
                embedder.dimensions(),
                index.dimensions()
            )));
        }
        Ok(Self {
            embedder,
            index,
            default_k: config.top_k,
        })
    }

    /// Top `k` chunks for `query`, most similar first
    ///
    /// A blank query or `k == 0` yields an empty result without touching
    /// the embedder.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&vector, k).await?;

        tracing::debug!(
            k,
            hits = hits.len(),
            top = hits.first().map(|h| h.similarity),
            "Retrieved chunks"
        );
        Ok(hits)
    }

    /// Retrieve with the configured `top_k`
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<ScoredEntry>> {
        self.retrieve(query, self.default_k).await
    }

    /// Configured default `k`
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// The index being searched
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The query embedder
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}
