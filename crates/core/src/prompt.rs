//! Prompt rendering for single-shot classification

use std::fmt::Write;

use crate::category::CategorySet;

/// Label of the category line in the response format
pub const CATEGORY_LABEL: &str = "category";

/// Label of the confidence line in the response format
pub const CONFIDENCE_LABEL: &str = "confidence";

/// Task instruction used when the caller supplies none
pub const DEFAULT_INSTRUCTIONS: &str = "You are a precise text classifier. \
Assign the input text to exactly one of the categories listed below, choosing \
the category whose description fits the text best.";

/// Renders the classification prompt
///
/// Pure function of the category set, the input text and the optional custom
/// instructions. The output contract at the end of the prompt is what
/// [`crate::parse_response`] expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptBuilder {
    instructions: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default task instruction
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.instructions = if instructions.trim().is_empty() {
            None
        } else {
            Some(instructions)
        };
        self
    }

    pub fn instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS)
    }

    /// Render the prompt for `text`
    pub fn build(&self, categories: &CategorySet, text: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(self.instructions().trim());
        prompt.push_str("\n\nCategories:\n");

        for category in categories {
            // Writing to a String cannot fail
            let _ = writeln!(prompt, "- {}: {}", category.name(), category.description().trim());
            if !category.examples().is_empty() {
                prompt.push_str("  Examples:\n");
                for example in category.examples() {
                    let _ = writeln!(prompt, "  - \"{}\"", single_line(example));
                }
            }
        }

        prompt.push_str("\nInput text:\n\"\"\"\n");
        prompt.push_str(text);
        prompt.push_str("\n\"\"\"\n\n");

        let _ = write!(
            prompt,
            "Respond with exactly two lines and nothing else:\n\
             {}: <one of: {}>\n\
             {}: <a number between 0.0 and 1.0>",
            CATEGORY_LABEL,
            categories.names().join(", "),
            CONFIDENCE_LABEL,
        );

        prompt
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn categories() -> CategorySet {
        CategorySet::new(vec![
            Category::new("cat_a", "First category"),
            Category::new("cat_b", "Second category").with_examples(["line one\nline two"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_prompt_contains_categories_in_order() {
        let prompt = PromptBuilder::new().build(&categories(), "some input");
        let a = prompt.find("- cat_a: First category").unwrap();
        let b = prompt.find("- cat_b: Second category").unwrap();
        assert!(a < b);
        assert!(prompt.contains("  - \"line one line two\""));
        assert!(prompt.contains("\"\"\"\nsome input\n\"\"\""));
    }

    #[test]
    fn test_prompt_output_contract() {
        let prompt = PromptBuilder::new().build(&categories(), "x");
        assert!(prompt.starts_with(DEFAULT_INSTRUCTIONS));
        assert!(prompt.ends_with(
            "category: <one of: cat_a, cat_b>\nconfidence: <a number between 0.0 and 1.0>"
        ));
    }

    #[test]
    fn test_custom_instructions() {
        let builder = PromptBuilder::new().with_instructions("Classify support tickets.");
        let prompt = builder.build(&categories(), "x");
        assert!(prompt.starts_with("Classify support tickets.\n\nCategories:"));
        assert!(!prompt.contains(DEFAULT_INSTRUCTIONS));

        let blank = PromptBuilder::new().with_instructions("  ");
        assert_eq!(blank.instructions(), DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = PromptBuilder::new();
        let set = categories();
        assert_eq!(builder.build(&set, "same"), builder.build(&set, "same"));
    }
}
