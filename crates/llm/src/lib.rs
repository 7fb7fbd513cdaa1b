//! labelvote LLM integration
//!
//! Provider-neutral completion trait plus Ollama and OpenAI-compatible clients

mod client;
mod llm_trait;
mod openai;
mod provider;
mod retry;
mod types;

pub use client::OllamaClient;
pub use llm_trait::LlmClient;
pub use openai::OpenAiClient;
pub use provider::build_client;
pub use types::{
    ChatChoice, ChatChoiceMessage, ChatMessage, ChatRequest, ChatResponse, GenerateOptions, GenerateRequest, GenerateResponse,
    GenerationParams,
};
