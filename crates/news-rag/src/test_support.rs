//! Shared fixtures for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, GenerationBackend, HashingEmbedder};
use crate::types::{Article, BackendStatus, EntryMetadata, IndexEntry};

/// A short single-chunk article
pub fn article(title: &str, source: &str, url: &str) -> Article {
    let content = format!("{}. Reported by {}.", title, source);
    article_with_content(title, source, url, &content)
}

/// An article with explicit content
pub fn article_with_content(title: &str, source: &str, url: &str, content: &str) -> Article {
    Article::new(title, content, "", source, url, None)
}

/// An index entry with synthetic metadata
pub fn entry(article_id: &str, chunk_index: u32, text: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        vector,
        text: text.to_string(),
        metadata: EntryMetadata {
            article_id: article_id.to_string(),
            title: format!("Article {}", article_id),
            source: "Test Wire".to_string(),
            url: format!("https://example.com/{}", article_id),
            published_at: None,
            chunk_index,
        },
    }
}

/// Hashing embedder that fails on texts containing a trigger
pub struct FailingEmbedder {
    inner: HashingEmbedder,
    trigger: String,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize, trigger: &str) -> Self {
        Self {
            inner: HashingEmbedder::new(dimensions).unwrap(),
            trigger: trigger.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(&self.trigger) {
            return Err(Error::embedding("model crashed"));
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

enum Script {
    Answer(String),
    Unavailable,
    Slow(Duration),
}

/// Generation backend with canned behavior and call accounting
pub struct ScriptedBackend {
    script: Script,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedBackend {
    fn with(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::with(Script::Answer(text.to_string()))
    }

    pub fn unavailable() -> Self {
        Self::with(Script::Unavailable)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with(Script::Slow(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());

        match &self.script {
            Script::Answer(text) => Ok(text.clone()),
            Script::Unavailable => Err(Error::backend_unavailable("connection refused")),
            Script::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("too late".to_string())
            }
        }
    }

    async fn health_check(&self) -> Result<BackendStatus> {
        Ok(match self.script {
            Script::Unavailable => BackendStatus::Unreachable("scripted".to_string()),
            _ => BackendStatus::Ready("scripted".to_string()),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}
