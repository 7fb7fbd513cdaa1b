use async_trait::async_trait;
use labelvote_common::{LabelVoteError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::retry::with_retry;
use crate::types::{GenerateOptions, GenerateRequest, GenerateResponse, GenerationParams};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LabelVoteError::network(format!("Failed to create HTTP client: {}", e)))?;

        info!("Ollama client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
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

    /// Generate text with Ollama (with retry logic)
    pub async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let response = with_retry("Ollama", self.max_retries, self.retry_base_delay, || {
            self.try_generate(&url, &request)
        })
        .await?;

        debug!("Received response from Ollama - Length: {}", response.len());
        Ok(response)
    }

    /// Single attempt to generate text
    async fn try_generate(&self, url: &str, request: &GenerateRequest) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| LabelVoteError::network(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| LabelVoteError::provider(format!("Ollama API error: {}", e)))?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LabelVoteError::provider(format!("Failed to parse response: {}", e)))?;

        if result.response.is_empty() {
            return Err(LabelVoteError::provider("Empty response from Ollama"));
        }

        Ok(result.response)
    }

    /// Build a non-streaming generate request for this client's model
    fn request_for(&self, prompt: &str, params: &GenerationParams) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: Some(false),
            options: Some(GenerateOptions::from(params)),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.generate(self.request_for(prompt, params)).await
    }

    fn describe(&self) -> String {
        format!("ollama/{}", self.model)
    }

    /// Test connection to Ollama
    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LabelVoteError::network(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }
}
