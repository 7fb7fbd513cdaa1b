use async_trait::async_trait;
use labelvote_common::{LabelVoteError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::retry::with_retry;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, GenerationParams};

/// Client for OpenAI and OpenAI-compatible chat completions endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

// Keep the API key out of debug output
impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl OpenAiClient {
    /// Create new OpenAI-compatible client
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LabelVoteError::network(format!("Failed to create HTTP client: {}", e)))?;

        info!("OpenAI client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            model,
            client,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        })
    }

    /// Set attempts per completion
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Model name sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_request(&self, prompt: &str, params: &GenerationParams) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    /// Single attempt at a chat completion
    async fn try_chat(&self, url: &str, request: &ChatRequest) -> Result<String> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LabelVoteError::network(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| LabelVoteError::provider(format!("OpenAI API error: {}", e)))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LabelVoteError::provider(format!("Failed to parse response: {}", e)))?;

        match parsed.first_content() {
            Some(content) if !content.is_empty() => Ok(content.to_string()),
            _ => Err(LabelVoteError::provider("Empty response from OpenAI")),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = self.chat_request(prompt, params);

        debug!(
            "Sending chat request - Model: {}, Prompt length: {}",
            request.model,
            prompt.len()
        );

        let content = with_retry("OpenAI", self.max_retries, self.retry_base_delay, || {
            self.try_chat(&url, &request)
        })
        .await?;

        debug!("Received chat response - Length: {}", content.len());
        Ok(content)
    }

    fn describe(&self) -> String {
        format!("openai/{}", self.model)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/v1/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LabelVoteError::network(format!("Failed to connect to OpenAI: {}", e)))?;
        Ok(response.status().is_success())
    }
}
