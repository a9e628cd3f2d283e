//! Answer generation with a grounded prompt

pub mod ollama;
mod orchestrator;
mod prompt;

pub use ollama::OllamaClient;
pub use orchestrator::NewsAnalyst;
pub use prompt::PromptBuilder;
