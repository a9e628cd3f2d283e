//! news-rag: retrieval-augmented question answering over news articles
//!
//! Articles are split into overlapping fixed-size chunks, embedded, and stored
//! in a persistent SQLite-backed vector index. Questions are answered by
//! retrieving the nearest chunks (cosine similarity) and asking a local
//! Ollama model for a grounded summary with source attribution.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use state::{NewsRag, PipelineStats};
pub use types::{
    article::Article,
    chunk::{Chunk, EntryMetadata, IndexEntry},
    response::{Answer, AnswerStatus, BackendStatus, IndexStats, IngestReport, ScoredEntry, SourceRef},
};
