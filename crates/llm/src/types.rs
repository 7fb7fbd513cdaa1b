use serde::{Deserialize, Serialize};

/// Provider-neutral generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature; provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationParams {
    /// Create params with both fields set
    pub fn new(temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Disable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Ollama generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

impl From<&GenerationParams> for GenerateOptions {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            num_predict: params
                .max_tokens
                .map(|n| i32::try_from(n).unwrap_or(i32::MAX)),
        }
    }
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Model name
    pub model: String,

    /// Generated text
    pub response: String,

    /// Whether generation is complete
    pub done: bool,
}

/// Chat message for OpenAI-compatible endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI chat completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// OpenAI chat completions response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}
