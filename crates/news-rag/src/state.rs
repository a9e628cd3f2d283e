//! Pipeline facade wiring configuration to providers

use serde::Serialize;
use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;
use crate::generation::NewsAnalyst;
use crate::ingestion::Indexer;
use crate::providers::{
    EmbeddingProvider, GenerationBackend, HashingEmbedder, LocalVectorIndex, OllamaEmbedder,
    OllamaLlm, VectorIndex,
};
use crate::retrieval::Retriever;
use crate::types::{Answer, Article, BackendStatus, IndexStats, IngestReport, ScoredEntry};

/// Collection statistics plus the models in use
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Vector index statistics
    #[serde(flatten)]
    pub index: IndexStats,
    /// Embedding provider name
    pub embedding_provider: String,
    /// Embedding model
    pub embedding_model: String,
    /// Generation backend name
    pub generation_backend: String,
    /// Generation model
    pub generation_model: String,
}

/// The assembled news RAG pipeline
///
/// Cheap to clone; all clones share the same index and providers.
#[derive(Clone)]
pub struct NewsRag {
    inner: Arc<NewsRagInner>,
}

struct NewsRagInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    indexer: Indexer,
    analyst: NewsAnalyst,
}

impl NewsRag {
    /// Build the pipeline from configuration
    ///
    /// Fails with a configuration error when the embedder cannot be
    /// initialized or its dimensionality disagrees with the stored collection.
    /// The generation backend is not contacted here; see `backend_status`.
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let embedder = build_embedder(&config).await?;
        tracing::info!(
            embedder = embedder.name(),
            model = embedder.model(),
            dimensions = embedder.dimensions(),
            llm = %config.llm.generate_model,
            storage = %config.vector_db.storage_path.display(),
            "Initializing news RAG pipeline"
        );
        let index: Arc<dyn VectorIndex> =
            Arc::new(LocalVectorIndex::open(&config.vector_db, embedder.dimensions())?);
        let backend: Arc<dyn GenerationBackend> = Arc::new(OllamaLlm::new(&config.llm)?);

        Self::from_parts(config, embedder, index, backend)
    }

    /// Assemble from explicit providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self> {
        let indexer = Indexer::new(
            &config.chunking,
            &config.embeddings,
            embedder.clone(),
            index.clone(),
        )?;
        let retriever = Arc::new(Retriever::new(
            embedder.clone(),
            index.clone(),
            &config.retrieval,
        )?);
        let analyst = NewsAnalyst::new(retriever, backend, &config.llm);

        Ok(Self {
            inner: Arc::new(NewsRagInner {
                config,
                embedder,
                index,
                indexer,
                analyst,
            }),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Chunk, embed and store a batch of articles
    pub async fn index_articles(&self, articles: &[Article]) -> Result<IngestReport> {
        self.inner.indexer.index_articles(articles).await
    }

    /// Raw retrieval without generation
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<ScoredEntry>> {
        let retriever = self.inner.analyst.retriever();
        retriever
            .retrieve(query, k.unwrap_or_else(|| retriever.default_k()))
            .await
    }

    /// Answer a question from the indexed articles
    pub async fn answer(&self, query: &str, k: Option<usize>) -> Result<Answer> {
        match k {
            Some(k) => self.inner.analyst.answer(query, k).await,
            None => self.inner.analyst.answer_default(query).await,
        }
    }

    /// Collection statistics and model identity
    pub async fn stats(&self) -> Result<PipelineStats> {
        let backend = self.inner.analyst.backend();
        Ok(PipelineStats {
            index: self.inner.index.stats().await?,
            embedding_provider: self.inner.embedder.name().to_string(),
            embedding_model: self.inner.embedder.model().to_string(),
            generation_backend: backend.name().to_string(),
            generation_model: backend.model().to_string(),
        })
    }

    /// Remove every indexed entry
    pub async fn clear(&self) -> Result<usize> {
        self.inner.index.clear().await
    }

    /// Probe the generation backend
    pub async fn backend_status(&self) -> Result<BackendStatus> {
        self.inner.analyst.backend().health_check().await
    }
}

async fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = &config.embeddings;
    match embeddings.provider {
        EmbeddingBackend::Ollama => Ok(Arc::new(
            OllamaEmbedder::connect(embeddings, &config.llm).await?,
        )),
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(embeddings.dimensions)?)),
        #[cfg(feature = "onnx")]
        EmbeddingBackend::Onnx => Ok(Arc::new(
            crate::providers::OnnxEmbedder::new(embeddings).await?,
        )),
        #[cfg(not(feature = "onnx"))]
        EmbeddingBackend::Onnx => Err(crate::error::Error::config(
            "embeddings.provider = \"onnx\" requires building with the `onnx` feature",
        )),
    }
}
