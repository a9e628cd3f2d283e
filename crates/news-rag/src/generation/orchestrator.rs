//! Answers questions by grounding the backend in retrieved articles

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::GenerationBackend;
use crate::retrieval::Retriever;
use crate::types::Answer;

use super::prompt::PromptBuilder;

/// Question-answering orchestrator
///
/// Never retries and never substitutes a canned answer for a backend
/// failure. The only fixed answers are for an empty collection or an empty
/// retrieval, and neither touches the backend.
pub struct NewsAnalyst {
    retriever: Arc<Retriever>,
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl NewsAnalyst {
    /// Create an orchestrator
    pub fn new(
        retriever: Arc<Retriever>,
        backend: Arc<dyn GenerationBackend>,
        config: &LlmConfig,
    ) -> Self {
        Self {
            retriever,
            backend,
            timeout: config.timeout(),
        }
    }

    /// Answer `query` from the top `k` chunks
    pub async fn answer(&self, query: &str, k: usize) -> Result<Answer> {
        let start = Instant::now();

        let hits = self.retriever.retrieve(query, k).await?;
        if hits.is_empty() {
            let elapsed = elapsed_ms(start);
            return if self.retriever.index().is_empty().await? {
                tracing::info!("Collection is empty, returning fixed answer");
                Ok(Answer::no_data(elapsed))
            } else {
                tracing::info!(query, "No chunks retrieved");
                Ok(Answer::no_results(elapsed))
            };
        }

        let context = PromptBuilder::build_context(&hits);
        let prompt = PromptBuilder::build_news_prompt(query, &context);

        tracing::info!(
            backend = self.backend.name(),
            model = self.backend.model(),
            chunks = hits.len(),
            "Generating answer"
        );

        let text = tokio::time::timeout(self.timeout, self.backend.generate(&prompt))
            .await
            .map_err(|_| {
                Error::BackendUnavailable(format!(
                    "{} did not answer within {}s",
                    self.backend.name(),
                    self.timeout.as_secs_f32()
                ))
            })??;

        let answer = Answer::new(text.trim().to_string(), &hits, elapsed_ms(start));
        tracing::info!(
            sources = answer.sources.len(),
            elapsed_ms = answer.processing_time_ms,
            "Answer generated"
        );
        Ok(answer)
    }

    /// Answer with the configured default `k`
    pub async fn answer_default(&self, query: &str) -> Result<Answer> {
        self.answer(query, self.retriever.default_k()).await
    }

    /// The retriever in use
    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// The generation backend in use
    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, EmbeddingConfig, RetrievalConfig};
    use crate::ingestion::Indexer;
    use crate::providers::{
        EmbeddingProvider, HashingEmbedder, LocalVectorIndex, OllamaLlm, VectorIndex,
    };
    use crate::storage::SqliteVectorIndex;
    use crate::test_support::{article, article_with_content, ScriptedBackend};
    use crate::types::{AnswerStatus, NO_DATA_ANSWER};

    struct Fixture {
        indexer: Indexer,
        retriever: Arc<Retriever>,
    }

    fn fixture() -> Fixture {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
        let index: Arc<dyn VectorIndex> = Arc::new(LocalVectorIndex::new(Arc::new(
            SqliteVectorIndex::in_memory("news", 384).unwrap(),
        )));
        let indexer = Indexer::new(
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
            embedder.clone(),
            index.clone(),
        )
        .unwrap();
        let retriever =
            Arc::new(Retriever::new(embedder, index, &RetrievalConfig::default()).unwrap());
        Fixture { indexer, retriever }
    }

    fn analyst(retriever: Arc<Retriever>, backend: Arc<dyn GenerationBackend>) -> NewsAnalyst {
        NewsAnalyst::new(retriever, backend, &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_empty_index_gives_fixed_answer_without_backend_call() {
        let fx = fixture();
        let backend = Arc::new(ScriptedBackend::answering("should not be used"));
        let analyst = analyst(fx.retriever, backend.clone());

        let answer = analyst.answer("What's new in AI?", 5).await.unwrap();
        assert_eq!(answer.status, AnswerStatus::NoData);
        assert_eq!(answer.text, NO_DATA_ANSWER);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_ai_articles_rank_above_weather() {
        let fx = fixture();
        fx.indexer
            .index_articles(&[
                article_with_content(
                    "AI labs race ahead",
                    "Tech Daily",
                    "https://techdaily.example/ai-labs",
                    "Artificial intelligence labs released AI models this week. AI assistants now write code.",
                ),
                article_with_content(
                    "Regulators study AI",
                    "World Wire",
                    "https://worldwire.example/ai-rules",
                    "Governments are drafting rules for artificial intelligence. Officials said AI oversight is a priority.",
                ),
                article_with_content(
                    "Weekend weather",
                    "Local News",
                    "https://local.example/weather",
                    "Weather forecasts predict heavy rain and strong winds across the region on Saturday.",
                ),
            ])
            .await
            .unwrap();

        let hits = fx.retriever.retrieve("What's new in AI?", 5).await.unwrap();
        assert_eq!(hits.len(), 3);
        let sources: Vec<&str> = hits.iter().map(|h| h.entry.metadata.source.as_str()).collect();
        assert!(sources[..2].contains(&"Tech Daily"));
        assert!(sources[..2].contains(&"World Wire"));
        assert_eq!(sources[2], "Local News");
        assert!(hits[1].similarity > hits[2].similarity);

        let backend = Arc::new(ScriptedBackend::answering("  AI is advancing quickly.  "));
        let analyst = analyst(fx.retriever, backend.clone());
        let answer = analyst.answer("What's new in AI?", 5).await.unwrap();

        assert_eq!(answer.status, AnswerStatus::Answered);
        assert_eq!(answer.text, "AI is advancing quickly.");
        assert_eq!(answer.chunks_retrieved, 3);
        assert_eq!(answer.sources.len(), 3);
        assert_eq!(backend.calls(), 1);

        let prompt = backend.last_prompt().unwrap();
        assert!(prompt.contains("What's new in AI?"));
        assert!(prompt.contains("Source: Tech Daily"));
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_an_error_not_an_answer() {
        let fx = fixture();
        fx.indexer
            .index_articles(&[article("Markets close higher", "Wire", "https://wire.example/markets")])
            .await
            .unwrap();

        let backend = Arc::new(ScriptedBackend::unavailable());
        let err = analyst(fx.retriever.clone(), backend.clone())
            .answer("anything", 5)
            .await
            .unwrap_err();
        assert!(err.is_backend_unavailable());
        assert_eq!(backend.calls(), 1);

        // Same behavior from the real client when nothing listens
        let llm = OllamaLlm::new(&LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        })
        .unwrap();
        let err = analyst(fx.retriever, Arc::new(llm))
            .answer("anything", 5)
            .await
            .unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let fx = fixture();
        fx.indexer
            .index_articles(&[article("Election night", "Wire", "https://wire.example/election")])
            .await
            .unwrap();

        let backend = Arc::new(ScriptedBackend::slow(Duration::from_secs(5)));
        let analyst = NewsAnalyst {
            retriever: fx.retriever,
            backend,
            timeout: Duration::from_millis(50),
        };

        let err = analyst.answer("election", 5).await.unwrap_err();
        assert!(err.is_backend_unavailable());
    }

    #[tokio::test]
    async fn test_zero_k_on_populated_index_is_no_results() {
        let fx = fixture();
        fx.indexer
            .index_articles(&[article("Transit strike", "Wire", "https://wire.example/strike")])
            .await
            .unwrap();

        let backend = Arc::new(ScriptedBackend::answering("unused"));
        let answer = analyst(fx.retriever, backend.clone())
            .answer("strike", 0)
            .await
            .unwrap();
        assert_eq!(answer.status, AnswerStatus::NoResults);
        assert_eq!(backend.calls(), 0);
    }
}
