//! Generation backend trait

use async_trait::async_trait;
use crate::error::Result;
use crate::types::BackendStatus;

/// Trait for text generation from a fully built prompt
///
/// Implementations must report connectivity failures as
/// `Error::BackendUnavailable` and never as an empty completion.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Probe reachability and model availability
    async fn health_check(&self) -> Result<BackendStatus>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}
