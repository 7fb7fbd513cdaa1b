use labelvote_common::{LabelVoteError, Result};
use labelvote_llm::{GenerationParams, LlmClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::category::CategorySet;
use crate::options::ClassifyOptions;
use crate::parser::parse_response;
use crate::prompt::PromptBuilder;
use crate::result::ClassificationResult;

/// A completion that parsed and named a category in the set
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedReply {
    pub(crate) category: String,
    pub(crate) confidence: f64,
    pub(crate) raw_response: String,
}

/// One LLM call: send the prompt, parse the reply, validate the category.
/// No retries here; those belong to the client.
pub(crate) async fn attempt(
    prompt: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    params: &GenerationParams,
) -> Result<ValidatedReply> {
    let raw_response = client.complete(prompt, params).await?;
    let parsed = parse_response(&raw_response)?;

    if !categories.contains(&parsed.category) {
        return Err(LabelVoteError::parse(
            format!("Unrecognized category '{}'", parsed.category),
            raw_response,
        ));
    }

    Ok(ValidatedReply {
        category: parsed.category,
        confidence: parsed.confidence,
        raw_response,
    })
}

pub(crate) fn ensure_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(LabelVoteError::invalid_input("Input text cannot be empty"));
    }
    Ok(())
}

pub(crate) async fn run_single(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    prompt_builder: &PromptBuilder,
    options: &ClassifyOptions,
) -> Result<ClassificationResult> {
    ensure_text(text)?;

    let prompt = prompt_builder.build(categories, text);
    debug!(
        "Single-shot classification via {} - Text length: {}, Categories: {}",
        client.describe(),
        text.len(),
        categories.len()
    );

    match attempt(&prompt, categories, client, &options.params).await {
        Ok(reply) => {
            debug!(
                "Classified as '{}' (confidence {:.2})",
                reply.category, reply.confidence
            );
            Ok(ClassificationResult::classified(
                reply.category,
                reply.confidence,
                reply.raw_response,
            ))
        }
        Err(e) if options.is_strict() => Err(e),
        Err(e) => {
            warn!("Classification failed, returning unknown: {}", e);
            let raw_response = e.raw_response().map(str::to_string);
            Ok(ClassificationResult::unknown(raw_response, e.to_string()))
        }
    }
}

/// Classify `text` with a single LLM call using the default prompt
pub async fn classify(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    options: &ClassifyOptions,
) -> Result<ClassificationResult> {
    run_single(text, categories, client, &PromptBuilder::default(), options).await
}

/// Classifier bound to an LLM client and a category set
///
/// Holds immutable defaults; every call may override them with its own
/// [`ClassifyOptions`]. Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct Classifier {
    pub(crate) client: Arc<dyn LlmClient>,
    pub(crate) categories: Arc<CategorySet>,
    pub(crate) prompt_builder: PromptBuilder,
    pub(crate) options: ClassifyOptions,
}

impl Classifier {
    /// Create new classifier with default options and prompt
    pub fn new(client: Arc<dyn LlmClient>, categories: impl Into<Arc<CategorySet>>) -> Self {
        let categories = categories.into();
        info!(
            "Classifier initialized: {} categories via {}",
            categories.len(),
            client.describe()
        );
        Self {
            client,
            categories,
            prompt_builder: PromptBuilder::default(),
            options: ClassifyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClassifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn options(&self) -> &ClassifyOptions {
        &self.options
    }

    /// Prompt that would be sent for `text`
    pub fn render_prompt(&self, text: &str) -> String {
        self.prompt_builder.build(&self.categories, text)
    }

    /// Single-shot classification with the classifier's defaults
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.classify_with(text, &self.options).await
    }

    /// Single-shot classification with per-call options
    pub async fn classify_with(
        &self,
        text: &str,
        options: &ClassifyOptions,
    ) -> Result<ClassificationResult> {
        run_single(
            text,
            &self.categories,
            self.client.as_ref(),
            &self.prompt_builder,
            options,
        )
        .await
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("client", &self.client.describe())
            .field("categories", &self.categories.names())
            .field("options", &self.options)
            .finish()
    }
}
