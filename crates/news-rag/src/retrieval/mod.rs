//! Query-time retrieval over the vector index

mod retriever;

pub use retriever::Retriever;
