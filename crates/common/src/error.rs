/// labelvote error types
#[derive(Debug, thiserror::Error)]
pub enum LabelVoteError {
    /// Invalid category set, options or environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The LLM provider call failed (transport, auth, status, empty body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// The completion did not follow the response format or named an unrecognized category
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        raw_response: String,
    },

    /// Every round of a voting call failed
    #[error("All {} voting rounds failed: {}", .rounds, .failures.join("; "))]
    AggregateFailure {
        rounds: usize,
        failures: Vec<String>,
    },

    /// The call was cancelled before it completed
    #[error("Classification cancelled")]
    Cancelled,

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LabelVoteError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create provider error
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create parse error carrying the offending completion
    pub fn parse<S: Into<String>, R: Into<String>>(msg: S, raw_response: R) -> Self {
        Self::Parse {
            message: msg.into(),
            raw_response: raw_response.into(),
        }
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error is a per-call classification failure
    /// (as opposed to a configuration or plumbing problem)
    pub fn is_classification_failure(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::Network(_) | Self::Parse { .. }
        )
    }

    /// Raw completion attached to the error, if any
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Parse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

// Process exit code mapping for the CLI
impl LabelVoteError {
    /// Get process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::InvalidInput(_) => 2,
            Self::Provider(_) => 3,
            Self::Network(_) => 3,
            Self::Parse { .. } => 4,
            Self::AggregateFailure { .. } => 5,
            Self::Cancelled => 130,
            Self::Io(_) => 1,
            Self::Json(_) => 1,
            Self::Other(_) => 1,
        }
    }
}
