use labelvote_common::{AppConfig, LabelVoteError, Result};
use labelvote_llm::GenerationParams;
use serde::{Deserialize, Serialize};

/// What to do when a classification cannot be validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Return the unknown sentinel with confidence 0.0 and a diagnostic
    #[default]
    Lenient,
    /// Return the underlying error
    Strict,
}

/// Per-call classification settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOptions {
    pub error_mode: ErrorMode,

    /// Voting rounds (ignored by single-shot calls)
    pub rounds: usize,

    /// Voting rounds in flight at once; 1 means sequential
    pub concurrency: usize,

    /// Generation parameters forwarded to the client
    pub params: GenerationParams,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            rounds: 3,
            concurrency: 1,
            params: GenerationParams::default(),
        }
    }
}

impl ClassifyOptions {
    /// Defaults taken from the application configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            error_mode: if config.strict {
                ErrorMode::Strict
            } else {
                ErrorMode::Lenient
            },
            rounds: config.voting_rounds,
            concurrency: config.voting_concurrency,
            params: GenerationParams::new(config.temperature, config.max_tokens),
        }
    }

    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.error_mode == ErrorMode::Strict
    }

    /// Check the settings a voting call depends on
    pub fn validate_voting(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(LabelVoteError::config("Voting rounds must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(LabelVoteError::config("Voting concurrency must be at least 1"));
        }
        Ok(())
    }
}
