use labelvote_common::{AppConfig, LabelVoteError, ProviderKind, Result};
use std::sync::Arc;
use tracing::info;

use crate::client::OllamaClient;
use crate::llm_trait::LlmClient;
use crate::openai::OpenAiClient;

/// Build the LLM client selected by the configuration
pub fn build_client(config: &AppConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        ProviderKind::Ollama => Arc::new(
            OllamaClient::new(&config.ollama_base_url, &config.llm_model)?
                .with_max_retries(config.max_retries),
        ),
        ProviderKind::OpenAi => {
            let api_key = config.openai_api_key.as_deref().ok_or_else(|| {
                LabelVoteError::config("OPENAI_API_KEY is required when LLM_PROVIDER=openai")
            })?;
            Arc::new(
                OpenAiClient::new(&config.openai_base_url, api_key, &config.llm_model)?
                    .with_max_retries(config.max_retries),
            )
        }
    };

    info!("Using LLM provider: {}", client.describe());
    Ok(client)
}
