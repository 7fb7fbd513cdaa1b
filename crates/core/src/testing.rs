//! Deterministic fake clients for classifier tests

use async_trait::async_trait;
use labelvote_common::{LabelVoteError, Result};
use labelvote_llm::{GenerationParams, LlmClient};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::category::{Category, CategorySet};

/// Render a well-formed completion
pub(crate) fn response(category: &str, confidence: f64) -> String {
    format!("category: {}\nconfidence: {}", category, confidence)
}

pub(crate) fn categories(names: &[&str]) -> CategorySet {
    CategorySet::new(
        names
            .iter()
            .map(|name| Category::new(*name, format!("{} description", name)))
            .collect(),
    )
    .unwrap()
}

/// Returns queued completions (or provider errors) in call order
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn new(script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Only successful completions
    pub(crate) fn replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LabelVoteError::provider(message)),
            None => Err(LabelVoteError::provider("script exhausted")),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Never completes; used to exercise cancellation
pub(crate) struct PendingClient;

#[async_trait]
impl LlmClient for PendingClient {
    async fn complete(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        std::future::pending().await
    }

    fn describe(&self) -> String {
        "pending".to_string()
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Records how many completions run at the same time
pub(crate) struct ConcurrencyProbe {
    reply: String,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ConcurrencyProbe {
    pub(crate) fn new(reply: String, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ConcurrencyProbe {
    async fn complete(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn describe(&self) -> String {
        "probe".to_string()
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}
