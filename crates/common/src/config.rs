use crate::error::LabelVoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// LLM provider backing the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI or any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = LabelVoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "open_ai" | "open-ai" => Ok(Self::OpenAi),
            other => Err(LabelVoteError::config(format!(
                "Unknown LLM provider '{}' (expected 'ollama' or 'openai')",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// labelvote application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which provider to build the LLM client for
    pub provider: ProviderKind,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// API key for the OpenAI-compatible provider
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Model name sent to the provider
    pub llm_model: String,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate per completion
    pub max_tokens: Option<u32>,

    /// Attempts per completion inside the provider client
    pub max_retries: u32,

    /// Default number of voting rounds
    pub voting_rounds: usize,

    /// Default number of voting rounds in flight at once
    pub voting_concurrency: usize,

    /// Surface classification failures as errors instead of unknown results
    pub strict: bool,

    /// Log level
    pub log_level: String,

    /// Log directory (console only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            ollama_base_url: "http://localhost:11434".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: None,
            llm_model: "llama3.2:latest".to_string(),
            temperature: None,
            max_tokens: Some(64),
            max_retries: 3,
            voting_rounds: 3,
            voting_concurrency: 1,
            strict: false,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, LabelVoteError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LabelVoteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let provider = match lookup("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.provider,
        };

        Ok(Self {
            provider,
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            llm_model: lookup("LLM_MODEL").unwrap_or(defaults.llm_model),
            temperature: Self::parse_value(&lookup, "LLM_TEMPERATURE")?.or(defaults.temperature),
            max_tokens: Self::parse_value(&lookup, "LLM_MAX_TOKENS")?.or(defaults.max_tokens),
            max_retries: Self::parse_value(&lookup, "LLM_MAX_RETRIES")?
                .unwrap_or(defaults.max_retries),
            voting_rounds: Self::parse_value(&lookup, "VOTING_ROUNDS")?
                .unwrap_or(defaults.voting_rounds),
            voting_concurrency: Self::parse_value(&lookup, "VOTING_CONCURRENCY")?
                .unwrap_or(defaults.voting_concurrency),
            strict: match lookup("CLASSIFY_STRICT") {
                Some(value) => Self::parse_flag("CLASSIFY_STRICT", &value)?,
                None => defaults.strict,
            },
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Parse an optional typed value, rejecting malformed input
    fn parse_value<F, T>(lookup: &F, key: &str) -> Result<Option<T>, LabelVoteError>
    where
        F: Fn(&str) -> Option<String>,
        T: FromStr,
    {
        match lookup(key) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                LabelVoteError::config(format!("Invalid value for {}: '{}'", key, raw))
            }),
        }
    }

    /// Parse a boolean flag (true/false, 1/0, yes/no)
    fn parse_flag(key: &str, raw: &str) -> Result<bool, LabelVoteError> {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(LabelVoteError::config(format!(
                "Invalid value for {}: '{}'",
                key, raw
            ))),
        }
    }

    /// Base URL of the configured provider
    pub fn provider_base_url(&self) -> &str {
        match self.provider {
            ProviderKind::Ollama => &self.ollama_base_url,
            ProviderKind::OpenAi => &self.openai_base_url,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), LabelVoteError> {
        if self.llm_model.trim().is_empty() {
            return Err(LabelVoteError::config("LLM model name cannot be empty"));
        }

        let base_url = self.provider_base_url();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(LabelVoteError::config(format!(
                "{} base URL must start with http:// or https://",
                self.provider
            )));
        }

        if self.provider == ProviderKind::OpenAi && self.openai_api_key.is_none() {
            return Err(LabelVoteError::config(
                "OPENAI_API_KEY is required when LLM_PROVIDER=openai",
            ));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(LabelVoteError::config(format!(
                    "Temperature must be within 0.0-2.0, got {}",
                    temperature
                )));
            }
        }

        if self.max_retries == 0 {
            return Err(LabelVoteError::config("LLM_MAX_RETRIES must be at least 1"));
        }

        if self.voting_rounds == 0 {
            return Err(LabelVoteError::config("VOTING_ROUNDS must be at least 1"));
        }

        if self.voting_concurrency == 0 {
            return Err(LabelVoteError::config(
                "VOTING_CONCURRENCY must be at least 1",
            ));
        }

        Ok(())
    }
}
