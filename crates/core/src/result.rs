use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::category::UNKNOWN_CATEGORY;

/// Outcome of a single-shot or voting classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Category name from the set used for the call, or [`UNKNOWN_CATEGORY`]
    pub category: String,

    /// Confidence within 0.0-1.0. Single-shot: the model's reported value.
    /// Voting: winner votes / rounds attempted.
    pub confidence: f64,

    /// Raw completion (single-shot only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Votes per category (voting only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_distribution: Option<BTreeMap<String, usize>>,

    /// Why the result is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ClassificationResult {
    /// Validated single-shot result
    pub fn classified(category: impl Into<String>, confidence: f64, raw_response: String) -> Self {
        Self {
            category: category.into(),
            confidence: clamp_confidence(confidence),
            raw_response: Some(raw_response),
            vote_distribution: None,
            diagnostic: None,
        }
    }

    /// Unknown sentinel with zero confidence
    pub fn unknown(raw_response: Option<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            confidence: 0.0,
            raw_response,
            vote_distribution: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Voting result for `winner` with `votes` out of `rounds`
    pub fn voted(
        winner: impl Into<String>,
        votes: usize,
        rounds: usize,
        distribution: BTreeMap<String, usize>,
    ) -> Self {
        let confidence = if rounds == 0 {
            0.0
        } else {
            votes as f64 / rounds as f64
        };
        Self {
            category: winner.into(),
            confidence: clamp_confidence(confidence),
            raw_response: None,
            vote_distribution: Some(distribution),
            diagnostic: None,
        }
    }

    /// Whether this is the unknown sentinel
    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }

    /// Votes recorded for `category` (voting results only)
    pub fn votes_for(&self, category: &str) -> usize {
        self.vote_distribution
            .as_ref()
            .and_then(|d| d.get(category).copied())
            .unwrap_or(0)
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
