//! Batch indexing: chunk, embed and upsert articles

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ChunkingConfig, EmbeddingConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::{Article, IndexEntry, IngestReport, SkipReason, SkippedArticle};

use super::chunker::TextChunker;

/// Turns articles into index entries
///
/// Failures that concern a single article (empty content, an embedding
/// error) are recorded in the report and the batch continues. Index write
/// failures abort the batch.
pub struct Indexer {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl Indexer {
    /// Create an indexer; the embedder and index must agree on dimensions
    pub fn new(
        chunking: &ChunkingConfig,
        embeddings: &EmbeddingConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(Error::Config(format!(
                "Embedder '{}' produces {} dimensions but the index expects {}",
                embedder.model(),
                embedder.dimensions(),
                index.dimensions()
            )));
        }

        Ok(Self {
            chunker: TextChunker::from_config(chunking)?,
            embedder,
            index,
            batch_size: embeddings.batch_size.max(1),
        })
    }

    /// The chunker in use
    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Index a batch of articles
    ///
    /// Re-indexing an article overwrites its chunks and drops any stale
    /// chunks beyond its new chunk count.
    pub async fn index_articles(&self, articles: &[Article]) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for article in articles {
            if !seen.insert(article.id.as_str()) {
                tracing::debug!(title = %article.title, "Duplicate article in batch");
                report.skipped.push(skipped(article, SkipReason::DuplicateInBatch));
                continue;
            }

            if !article.has_content() {
                tracing::warn!(title = %article.title, source = %article.source, "Article has no content, skipping");
                report.skipped.push(skipped(article, SkipReason::EmptyContent));
                continue;
            }

            let entries = match self.embed_article(article).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(title = %article.title, error = %e, "Embedding failed, skipping article");
                    report
                        .skipped
                        .push(skipped(article, SkipReason::EmbeddingFailed(e.to_string())));
                    continue;
                }
            };

            let chunk_count = entries.len() as u32;
            report.chunks_indexed += self.index.upsert(&entries).await?;
            report.chunks_pruned += self.index.truncate_article(&article.id, chunk_count).await?;
            report.articles_indexed += 1;

            tracing::debug!(title = %article.title, chunks = chunk_count, "Article indexed");
        }

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            articles = report.articles_indexed,
            chunks = report.chunks_indexed,
            pruned = report.chunks_pruned,
            skipped = report.skipped.len(),
            elapsed_ms = report.processing_time_ms,
            "Indexing batch complete"
        );
        Ok(report)
    }

    /// Chunk and embed one article
    async fn embed_article(&self, article: &Article) -> Result<Vec<IndexEntry>> {
        let chunks = self.chunker.chunk_article(article);
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| chunk.into_entry(vector)),
            );
        }
        Ok(entries)
    }
}

fn skipped(article: &Article, reason: SkipReason) -> SkippedArticle {
    SkippedArticle {
        article_id: article.id.clone(),
        title: article.title.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{HashingEmbedder, LocalVectorIndex};
    use crate::storage::SqliteVectorIndex;
    use crate::test_support::{article, article_with_content, FailingEmbedder};

    fn indexer_with(embedder: Arc<dyn EmbeddingProvider>) -> (Indexer, Arc<dyn VectorIndex>) {
        let index: Arc<dyn VectorIndex> = Arc::new(LocalVectorIndex::new(Arc::new(
            SqliteVectorIndex::in_memory("news", embedder.dimensions()).unwrap(),
        )));
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let indexer = Indexer::new(
            &chunking,
            &EmbeddingConfig::default(),
            embedder,
            index.clone(),
        )
        .unwrap();
        (indexer, index)
    }

    #[tokio::test]
    async fn test_index_batch_with_skips() {
        let (indexer, index) = indexer_with(Arc::new(HashingEmbedder::default()));

        let long = "Parliament debated the energy bill late into the night. ".repeat(5);
        let articles = vec![
            article_with_content("Energy bill", "Wire", "https://example.com/energy", &long),
            article_with_content("Blank", "Wire", "https://example.com/blank", "   "),
            article_with_content("Energy bill", "Wire", "https://example.com/energy", &long),
            article("Short one", "Daily", "https://example.com/short"),
        ];

        let report = indexer.index_articles(&articles).await.unwrap();
        let expected_chunks = indexer.chunker().split_text(&long).len() + 1;

        assert_eq!(report.articles_indexed, 2);
        assert_eq!(report.chunks_indexed, expected_chunks);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].reason, SkipReason::EmptyContent);
        assert_eq!(report.skipped[1].reason, SkipReason::DuplicateInBatch);
        assert!(!report.is_complete());
        assert_eq!(index.len().await.unwrap(), expected_chunks);
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent_and_prunes() {
        let (indexer, index) = indexer_with(Arc::new(HashingEmbedder::default()));
        let url = "https://example.com/developing";

        let long = article_with_content("Developing", "Wire", url, &"Update. ".repeat(60));
        indexer.index_articles(std::slice::from_ref(&long)).await.unwrap();
        let before = index.len().await.unwrap();
        assert!(before > 1);

        indexer.index_articles(std::slice::from_ref(&long)).await.unwrap();
        assert_eq!(index.len().await.unwrap(), before);

        let short = article_with_content("Developing", "Wire", url, "Story withdrawn.");
        let report = indexer.index_articles(&[short]).await.unwrap();
        assert_eq!(report.chunks_pruned, before - 1);
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_isolated() {
        let (indexer, index) = indexer_with(Arc::new(FailingEmbedder::new(384, "poison")));

        let articles = vec![
            article_with_content("Bad", "Wire", "https://example.com/bad", "poison pill content"),
            article_with_content("Good", "Wire", "https://example.com/good", "clean content"),
        ];
        let report = indexer.index_articles(&articles).await.unwrap();

        assert_eq!(report.articles_indexed, 1);
        assert!(matches!(report.skipped[0].reason, SkipReason::EmbeddingFailed(_)));
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected_at_construction() {
        let index: Arc<dyn VectorIndex> = Arc::new(LocalVectorIndex::new(Arc::new(
            SqliteVectorIndex::in_memory("news", 8).unwrap(),
        )));
        let err = Indexer::new(
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
            Arc::new(HashingEmbedder::default()),
            index,
        )
        .err()
        .unwrap();
        assert!(err.is_config());
    }
}
