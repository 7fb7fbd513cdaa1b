use futures::stream::{self, StreamExt};
use labelvote_common::{LabelVoteError, Result};
use labelvote_llm::LlmClient;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::category::CategorySet;
use crate::classifier::{attempt, ensure_text, Classifier, ValidatedReply};
use crate::options::ClassifyOptions;
use crate::prompt::PromptBuilder;
use crate::result::ClassificationResult;

/// Votes collected for one category
#[derive(Debug, Default)]
struct Ballot {
    confidences: Vec<f64>,
}

impl Ballot {
    fn votes(&self) -> usize {
        self.confidences.len()
    }

    /// Mean self-reported confidence. Values are summed in sorted order so
    /// the mean does not depend on the order rounds completed in.
    fn mean_confidence(&self) -> f64 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        let mut sorted = self.confidences.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.iter().sum::<f64>() / sorted.len() as f64
    }
}

/// Per-category tally of successful rounds
#[derive(Debug, Default)]
pub(crate) struct Tally {
    ballots: HashMap<String, Ballot>,
}

impl Tally {
    pub(crate) fn record(&mut self, category: &str, confidence: f64) {
        self.ballots
            .entry(category.to_string())
            .or_default()
            .confidences
            .push(confidence);
    }

    pub(crate) fn distribution(&self) -> BTreeMap<String, usize> {
        self.ballots
            .iter()
            .map(|(name, ballot)| (name.clone(), ballot.votes()))
            .collect()
    }

    /// Winning category and its vote count.
    ///
    /// Most votes wins; ties go to the higher mean confidence, then to the
    /// category listed first in `categories`.
    pub(crate) fn winner(&self, categories: &CategorySet) -> Option<(&str, usize)> {
        self.ballots
            .iter()
            .max_by(|(name_a, a), (name_b, b)| {
                a.votes()
                    .cmp(&b.votes())
                    .then_with(|| a.mean_confidence().total_cmp(&b.mean_confidence()))
                    .then_with(|| compare_position(categories, name_b, name_a))
            })
            .map(|(name, ballot)| (name.as_str(), ballot.votes()))
    }
}

fn compare_position(categories: &CategorySet, a: &str, b: &str) -> Ordering {
    let pos = |name: &str| categories.position(name).unwrap_or(usize::MAX);
    pos(a).cmp(&pos(b))
}

pub(crate) async fn run_voting(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    prompt_builder: &PromptBuilder,
    options: &ClassifyOptions,
) -> Result<ClassificationResult> {
    options.validate_voting()?;
    ensure_text(text)?;

    let rounds = options.rounds;
    let prompt = prompt_builder.build(categories, text);

    info!(
        "Voting classification via {} - Rounds: {}, Concurrency: {}",
        client.describe(),
        rounds,
        options.concurrency
    );

    let outcomes: Vec<(usize, Result<ValidatedReply>)> = stream::iter(1..=rounds)
        .map(|round| {
            let prompt = prompt.as_str();
            async move {
                let outcome = attempt(prompt, categories, client, &options.params).await;
                (round, outcome)
            }
        })
        .buffer_unordered(options.concurrency)
        .collect()
        .await;

    let mut tally = Tally::default();
    let mut failures = Vec::new();
    for (round, outcome) in outcomes {
        match outcome {
            Ok(reply) => {
                debug!(
                    "Round {}/{}: '{}' (confidence {:.2})",
                    round, rounds, reply.category, reply.confidence
                );
                tally.record(&reply.category, reply.confidence);
            }
            Err(e) => {
                warn!("Round {}/{} failed: {}", round, rounds, e);
                failures.push((round, e.to_string()));
            }
        }
    }
    failures.sort_by_key(|(round, _)| *round);

    let distribution = tally.distribution();
    match tally.winner(categories) {
        Some((winner, votes)) => {
            info!(
                "Voting resolved to '{}' with {}/{} votes ({} failed rounds)",
                winner,
                votes,
                rounds,
                failures.len()
            );
            Ok(ClassificationResult::voted(winner, votes, rounds, distribution))
        }
        None => {
            let failure = LabelVoteError::AggregateFailure {
                rounds,
                failures: failures
                    .into_iter()
                    .map(|(round, message)| format!("round {}: {}", round, message))
                    .collect(),
            };
            if options.is_strict() {
                return Err(failure);
            }
            warn!("{}", failure);
            let mut result = ClassificationResult::unknown(None, failure.to_string());
            result.vote_distribution = Some(distribution);
            Ok(result)
        }
    }
}

/// Classify `text` by majority vote over `options.rounds` independent calls
/// using the default prompt.
///
/// Failed rounds count toward the rounds attempted but toward no category.
/// Dropping the returned future abandons any rounds still in flight.
pub async fn classify_with_voting(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    options: &ClassifyOptions,
) -> Result<ClassificationResult> {
    run_voting(text, categories, client, &PromptBuilder::default(), options).await
}

/// [`classify_with_voting`] that stops with [`LabelVoteError::Cancelled`]
/// as soon as `cancel` fires. Completed rounds are discarded.
pub async fn classify_with_voting_cancellable(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    options: &ClassifyOptions,
    cancel: &CancellationToken,
) -> Result<ClassificationResult> {
    run_cancellable(
        text,
        categories,
        client,
        &PromptBuilder::default(),
        options,
        cancel,
    )
    .await
}

async fn run_cancellable(
    text: &str,
    categories: &CategorySet,
    client: &dyn LlmClient,
    prompt_builder: &PromptBuilder,
    options: &ClassifyOptions,
    cancel: &CancellationToken,
) -> Result<ClassificationResult> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Voting classification cancelled");
            Err(LabelVoteError::Cancelled)
        }
        result = run_voting(text, categories, client, prompt_builder, options) => result,
    }
}

impl Classifier {
    /// Voting classification with the classifier's defaults
    pub async fn classify_with_voting(&self, text: &str) -> Result<ClassificationResult> {
        self.classify_with_voting_opts(text, &self.options).await
    }

    /// Voting classification with per-call options
    pub async fn classify_with_voting_opts(
        &self,
        text: &str,
        options: &ClassifyOptions,
    ) -> Result<ClassificationResult> {
        run_voting(
            text,
            &self.categories,
            self.client.as_ref(),
            &self.prompt_builder,
            options,
        )
        .await
    }

    /// Voting classification that can be cancelled through `cancel`
    pub async fn classify_with_voting_cancellable(
        &self,
        text: &str,
        options: &ClassifyOptions,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult> {
        run_cancellable(
            text,
            &self.categories,
            self.client.as_ref(),
            &self.prompt_builder,
            options,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::UNKNOWN_CATEGORY;
    use crate::testing::{categories, response, ConcurrencyProbe, PendingClient, ScriptedClient};
    use std::sync::Arc;
    use std::time::Duration;

    fn options(rounds: usize) -> ClassifyOptions {
        ClassifyOptions::default().with_rounds(rounds)
    }

    #[tokio::test]
    async fn test_majority_wins() {
        let set = categories(&["cat_a", "cat_b"]);
        let client = ScriptedClient::replies([
            response("cat_a", 0.6),
            response("cat_a", 0.7),
            response("cat_b", 0.99),
        ]);

        let result = classify_with_voting("text", &set, &client, &options(3))
            .await
            .unwrap();

        assert_eq!(result.category, "cat_a");
        assert_eq!(result.confidence, 2.0 / 3.0);
        let expected: BTreeMap<String, usize> =
            [("cat_a".to_string(), 2), ("cat_b".to_string(), 1)].into_iter().collect();
        assert_eq!(result.vote_distribution, Some(expected));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_tie_broken_by_mean_confidence() {
        let set = categories(&["cat_a", "cat_b"]);

        let client = ScriptedClient::replies([response("cat_a", 0.9), response("cat_b", 0.6)]);
        let result = classify_with_voting("text", &set, &client, &options(2))
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
        assert_eq!(result.confidence, 0.5);

        // Order of arrival does not matter
        let client = ScriptedClient::replies([response("cat_b", 0.6), response("cat_a", 0.9)]);
        let result = classify_with_voting("text", &set, &client, &options(2))
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
    }

    #[tokio::test]
    async fn test_tie_on_confidence_falls_back_to_set_order() {
        let set = categories(&["cat_b", "cat_a"]);
        let client = ScriptedClient::replies([response("cat_a", 0.8), response("cat_b", 0.8)]);

        let result = classify_with_voting("text", &set, &client, &options(2))
            .await
            .unwrap();
        assert_eq!(result.category, "cat_b");
    }

    #[tokio::test]
    async fn test_failed_rounds_count_toward_total() {
        let set = categories(&["cat_a", "cat_b"]);
        let client = ScriptedClient::new(vec![
            Ok(response("cat_a", 0.9)),
            Err("timeout".to_string()),
            Ok("no idea".to_string()),
            Ok(response("not_a_category", 0.9)),
        ]);

        let result = classify_with_voting("text", &set, &client, &options(4))
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
        assert_eq!(result.confidence, 0.25);
        assert_eq!(result.votes_for("cat_a"), 1);
        assert_eq!(result.vote_distribution.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_rounds_fail_lenient() {
        let set = categories(&["cat_a"]);
        let client = ScriptedClient::replies(["garbage", "more garbage", "category: cat_a"]);

        let result = classify_with_voting("text", &set, &client, &options(3))
            .await
            .unwrap();
        assert_eq!(result.category, UNKNOWN_CATEGORY);
        assert_eq!(result.confidence, 0.0);
        let diagnostic = result.diagnostic.unwrap();
        assert!(diagnostic.starts_with("All 3 voting rounds failed"));
        assert!(diagnostic.contains("round 1:"));
        assert_eq!(result.vote_distribution, Some(BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_all_rounds_fail_strict() {
        let set = categories(&["cat_a"]);
        let client = ScriptedClient::replies(["garbage", "garbage"]);

        let err = classify_with_voting("text", &set, &client, &options(2).strict())
            .await
            .unwrap_err();
        match err {
            LabelVoteError::AggregateFailure { rounds, failures } => {
                assert_eq!(rounds, 2);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_strict_mode_tolerates_partial_failure() {
        let set = categories(&["cat_a"]);
        let client = ScriptedClient::new(vec![
            Err("rate limited".to_string()),
            Ok(response("cat_a", 0.4)),
        ]);

        let result = classify_with_voting("text", &set, &client, &options(2).strict())
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
        assert_eq!(result.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_zero_rounds_rejected() {
        let set = categories(&["cat_a"]);
        let client = ScriptedClient::replies([response("cat_a", 0.5)]);

        let err = classify_with_voting("text", &set, &client, &options(0))
            .await
            .unwrap_err();
        assert!(matches!(err, LabelVoteError::Config(_)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_round() {
        let set = categories(&["cat_a"]);
        let client = ScriptedClient::replies([response("cat_a", 0.3)]);

        let result = classify_with_voting("text", &set, &client, &options(1))
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let set = categories(&["cat_a"]);

        let probe = ConcurrencyProbe::new(response("cat_a", 0.5), Duration::from_millis(20));
        let result = classify_with_voting("text", &set, &probe, &options(4))
            .await
            .unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(probe.max_in_flight(), 1);

        let probe = ConcurrencyProbe::new(response("cat_a", 0.5), Duration::from_millis(20));
        let result = classify_with_voting("text", &set, &probe, &options(6).with_concurrency(3))
            .await
            .unwrap();
        assert_eq!(result.votes_for("cat_a"), 6);
        assert_eq!(probe.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_matches_sequential() {
        let set = categories(&["cat_a", "cat_b", "cat_c"]);
        let replies = [
            response("cat_b", 0.4),
            response("cat_a", 0.9),
            response("cat_c", 0.2),
            response("cat_b", 0.6),
            response("cat_a", 0.5),
        ];

        let sequential = classify_with_voting(
            "text",
            &set,
            &ScriptedClient::replies(replies.clone()),
            &options(5),
        )
        .await
        .unwrap();
        let concurrent = classify_with_voting(
            "text",
            &set,
            &ScriptedClient::replies(replies),
            &options(5).with_concurrency(5),
        )
        .await
        .unwrap();

        assert_eq!(sequential, concurrent);
        assert_eq!(sequential.category, "cat_a");
        assert_eq!(sequential.confidence, 0.4);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let set = categories(&["cat_a"]);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = classify_with_voting_cancellable(
            "text",
            &set,
            &PendingClient,
            &options(3).with_concurrency(3),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LabelVoteError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellable_completes_when_not_cancelled() {
        let client = Arc::new(ScriptedClient::replies([
            response("cat_a", 0.5),
            response("cat_a", 0.5),
        ]));
        let classifier = Classifier::new(client, categories(&["cat_a"]));
        let token = CancellationToken::new();

        let result = classifier
            .classify_with_voting_cancellable("text", &options(2), &token)
            .await
            .unwrap();
        assert_eq!(result.category, "cat_a");
    }

    #[tokio::test]
    async fn test_classifier_voting_defaults() {
        let client = Arc::new(ScriptedClient::replies([
            response("cat_b", 0.5),
            response("cat_a", 0.5),
            response("cat_b", 0.5),
        ]));
        let classifier = Classifier::new(client, categories(&["cat_a", "cat_b"]))
            .with_options(ClassifyOptions::default().with_rounds(3));

        let result = classifier.classify_with_voting("text").await.unwrap();
        assert_eq!(result.category, "cat_b");
        assert_eq!(result.votes_for("cat_a"), 1);
    }
}
