//! labelvote core
//!
//! Category registry, prompt rendering, response parsing and the single-shot
//! and voting classifiers built on top of an injected [`LlmClient`].

mod category;
mod classifier;
mod options;
mod parser;
mod prompt;
mod result;
mod voting;

#[cfg(test)]
mod testing;

pub use category::{Category, CategorySet, UNKNOWN_CATEGORY};
pub use classifier::{classify, Classifier};
pub use options::{ClassifyOptions, ErrorMode};
pub use parser::{parse_response, ParsedResponse};
pub use prompt::{PromptBuilder, CATEGORY_LABEL, CONFIDENCE_LABEL, DEFAULT_INSTRUCTIONS};
pub use result::ClassificationResult;
pub use voting::{classify_with_voting, classify_with_voting_cancellable};

pub use labelvote_common::{LabelVoteError, Result};
pub use labelvote_llm::{GenerationParams, LlmClient};
