pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, ProviderKind};
pub use error::LabelVoteError;
pub type Result<T> = std::result::Result<T, LabelVoteError>;
