//! Error types for the RAG pipeline

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding error after the provider was initialized
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index storage error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Generation backend unreachable or timed out
    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Generation backend answered with an error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a backend-unavailable error
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for generation backend connectivity failures
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// True for startup configuration failures
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::VectorDb(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}
