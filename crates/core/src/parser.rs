//! Strict parser for the two-line response format:
//!
//! ```text
//! category: <name>
//! confidence: <0.0-1.0>
//! ```
//!
//! Labels match case-insensitively and may come in either order. Blank lines
//! and surrounding whitespace are ignored; any other line is rejected.

use labelvote_common::{LabelVoteError, Result};

use crate::prompt::{CATEGORY_LABEL, CONFIDENCE_LABEL};

/// Fields extracted from a completion, not yet validated against a category set
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub category: String,
    pub confidence: f64,
}

/// Parse a raw completion into its category and confidence fields
pub fn parse_response(raw: &str) -> Result<ParsedResponse> {
    let mut category: Option<String> = None;
    let mut confidence: Option<f64> = None;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (label, value) = line.split_once(':').ok_or_else(|| {
            LabelVoteError::parse(format!("Unexpected line without a label: '{}'", line), raw)
        })?;
        let label = label.trim().to_lowercase();
        let value = value.trim();

        if label == CATEGORY_LABEL {
            if category.is_some() {
                return Err(LabelVoteError::parse("Duplicate category line", raw));
            }
            if value.is_empty() {
                return Err(LabelVoteError::parse("Empty category value", raw));
            }
            category = Some(value.to_string());
        } else if label == CONFIDENCE_LABEL {
            if confidence.is_some() {
                return Err(LabelVoteError::parse("Duplicate confidence line", raw));
            }
            confidence = Some(parse_confidence(value, raw)?);
        } else {
            return Err(LabelVoteError::parse(
                format!("Unexpected label '{}'", label),
                raw,
            ));
        }
    }

    match (category, confidence) {
        (Some(category), Some(confidence)) => Ok(ParsedResponse {
            category,
            confidence,
        }),
        (None, _) => Err(LabelVoteError::parse("Missing category line", raw)),
        (_, None) => Err(LabelVoteError::parse("Missing confidence line", raw)),
    }
}

fn parse_confidence(value: &str, raw: &str) -> Result<f64> {
    let confidence: f64 = value.parse().map_err(|_| {
        LabelVoteError::parse(format!("Confidence '{}' is not a number", value), raw)
    })?;

    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(LabelVoteError::parse(
            format!("Confidence {} is outside 0.0-1.0", value),
            raw,
        ));
    }

    Ok(confidence)
}
