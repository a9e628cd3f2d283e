//! Core types for the RAG pipeline

pub mod article;
pub mod chunk;
pub mod response;

pub use article::Article;
pub use chunk::{Chunk, EntryMetadata, IndexEntry};
pub use response::{
    Answer, AnswerStatus, BackendStatus, IndexStats, IngestReport, ScoredEntry, SkipReason,
    SkippedArticle, SourceRef, NO_DATA_ANSWER, NO_RESULTS_ANSWER,
};
