//! Article ingestion: chunking and batch indexing

mod chunker;
mod pipeline;

pub use chunker::{Span, TextChunker};
pub use pipeline::Indexer;
