//! Provider abstractions for embeddings, vector indexing and generation
//!
//! Trait seams let the pipeline run against Ollama, an offline hashing
//! embedder or a local ONNX model without changing the orchestration code.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_index;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use llm::GenerationBackend;
pub use local::LocalVectorIndex;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_index::VectorIndex;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;
