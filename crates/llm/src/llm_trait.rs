use crate::types::GenerationParams;
use async_trait::async_trait;
use labelvote_common::Result;

/// Common trait for LLM clients
///
/// The classifier depends only on this narrow capability. Retries, auth and
/// rate limiting are the implementor's responsibility.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt and return the generated text
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Short provider/model label used in logs
    fn describe(&self) -> String;

    /// Test connection/availability
    async fn test_connection(&self) -> Result<bool>;
}
