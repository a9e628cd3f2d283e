//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
}

impl RagConfig {
    /// Read a TOML configuration file
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override selected fields from `NEWS_RAG_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("NEWS_RAG_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("NEWS_RAG_LLM_MODEL") {
            self.llm.generate_model = model;
        }
        if let Ok(model) = std::env::var("NEWS_RAG_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Ok(path) = std::env::var("NEWS_RAG_STORAGE_PATH") {
            self.vector_db.storage_path = PathBuf::from(path);
        }
        if let Ok(collection) = std::env::var("NEWS_RAG_COLLECTION") {
            self.vector_db.collection = collection;
        }
        if let Ok(top_k) = std::env::var("NEWS_RAG_TOP_K") {
            self.retrieval.top_k = top_k
                .parse()
                .map_err(|_| Error::Config(format!("NEWS_RAG_TOP_K is not a number: {}", top_k)))?;
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be positive"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be positive"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be positive"));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::config("vector_db.collection must not be empty"));
        }
        Ok(())
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embedding endpoint
    #[default]
    Ollama,
    /// Offline feature-hashing embedder
    Hashing,
    /// Local ONNX sentence-transformer (feature `onnx`)
    Onnx,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedder to construct
    pub provider: EmbeddingBackend,
    /// Model to use (Ollama tag or sentence-transformers name)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length (ONNX only)
    pub max_length: usize,
    /// Cache directory for downloaded models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "all-minilm".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("news-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Overlap with the preceding chunk in characters
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Require `0 <= overlap < size`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved when the caller gives no `k`
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds (bounds every backend call)
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Backend call timeout
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2".to_string(),
            temperature: 0.3,  // Lower for more factual answers
            timeout_secs: 120,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// SQLite file backing the index
    pub storage_path: PathBuf,
    /// Collection name
    pub collection: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("news-rag")
            .join("index.db");

        Self {
            storage_path,
            collection: "news_articles".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.vector_db.collection, "news_articles");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news-rag.toml");
        std::fs::write(
            &path,
            r#"
[chunking]
chunk_size = 500

[embeddings]
provider = "hashing"

[llm]
generate_model = "phi3"
"#,
        )
        .unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hashing);
        assert_eq!(config.llm.generate_model, "phi3");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[chunking\nchunk_size = ").unwrap();
        assert!(RagConfig::from_file(&path).unwrap_err().is_config());
    }
}
