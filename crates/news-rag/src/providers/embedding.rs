//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// A provider is bound to one model for its lifetime, so its dimensionality
/// never changes and identical text always maps to an identical vector.
///
/// Implementations:
/// - `OllamaEmbedder`: Ollama `/api/embeddings` (all-minilm, nomic-embed-text)
/// - `HashingEmbedder`: offline feature hashing
/// - `OnnxEmbedder`: local sentence-transformer (feature `onnx`)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions (384 for all-minilm)
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;
}
