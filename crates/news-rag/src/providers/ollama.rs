//! Ollama-based providers for embeddings and generation
//!
//! Wraps `OllamaClient` to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::generation::ollama::model_matches;
use crate::generation::OllamaClient;
use crate::types::BackendStatus;

use super::embedding::EmbeddingProvider;
use super::llm::GenerationBackend;

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Connect to Ollama and verify the embedding model
    ///
    /// Embeds a probe string once. An unreachable server, a missing model or
    /// a dimensionality other than `config.dimensions` is a configuration
    /// error, so the pipeline never starts with a broken embedder.
    pub async fn connect(config: &EmbeddingConfig, llm: &LlmConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(llm)?);
        Self::from_client(client, config).await
    }

    /// Create from an existing client, probing the model
    pub async fn from_client(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Result<Self> {
        let probe = client
            .embed(&config.model, "dimension probe")
            .await
            .map_err(|e| {
                Error::Config(format!(
                    "Embedding model '{}' unavailable at {}: {}",
                    config.model,
                    client.base_url(),
                    e
                ))
            })?;

        if probe.len() != config.dimensions {
            return Err(Error::Config(format!(
                "Embedding model '{}' produces {} dimensions, configured for {}",
                config.model,
                probe.len(),
                config.dimensions
            )));
        }

        tracing::info!(
            model = %config.model,
            dimensions = config.dimensions,
            "Ollama embedder ready"
        );

        Ok(Self {
            client,
            dimensions: config.dimensions,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.client.embed(&self.model, text).await.map_err(|e| match e {
            Error::Embedding(_) => e,
            other => Error::Embedding(other.to_string()),
        })?;

        if vector.len() != self.dimensions {
            return Err(Error::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama generation backend
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create a new Ollama generation backend
    ///
    /// Does not contact the server; use `health_check` for that.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(OllamaClient::new(config)?),
            model: config.generate_model.clone(),
        })
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl GenerationBackend for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(&self.model, prompt).await
    }

    async fn health_check(&self) -> Result<BackendStatus> {
        match self.client.tags().await {
            Ok(models) => {
                if models.iter().any(|m| model_matches(m, &self.model)) {
                    Ok(BackendStatus::Ready(format!(
                        "Ollama at {} serving '{}'",
                        self.client.base_url(),
                        self.model
                    )))
                } else {
                    Ok(BackendStatus::ModelMissing(format!(
                        "Model '{}' not installed; run `ollama pull {}`",
                        self.model, self.model
                    )))
                }
            }
            Err(e) if e.is_backend_unavailable() => Ok(BackendStatus::Unreachable(format!(
                "Cannot reach Ollama at {}: {}",
                self.client.base_url(),
                e
            ))),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
