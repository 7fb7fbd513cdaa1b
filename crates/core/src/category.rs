use labelvote_common::{LabelVoteError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Category value reported when no valid category could be determined.
/// Reserved: no user category may carry this name.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A named, described label the LLM may assign to a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    name: String,
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    examples: Vec<String>,
}

impl Category {
    /// Create a category without examples
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            examples: Vec::new(),
        }
    }

    /// Attach few-shot example texts, in order
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    fn validate_name(&self) -> Result<()> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(LabelVoteError::config("Category name cannot be empty"));
        }
        if name.trim() != name {
            return Err(LabelVoteError::config(format!(
                "Category name '{}' has leading or trailing whitespace",
                name
            )));
        }
        if name.contains(['\n', '\r']) {
            return Err(LabelVoteError::config(format!(
                "Category name '{}' contains a line break",
                name.escape_debug()
            )));
        }
        if name == UNKNOWN_CATEGORY {
            return Err(LabelVoteError::config(format!(
                "Category name '{}' is reserved",
                UNKNOWN_CATEGORY
            )));
        }
        Ok(())
    }
}

/// Ordered, name-unique collection of categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct CategorySet {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl CategorySet {
    /// Build a category set; fails on an empty list, an invalid name or a
    /// duplicate name (case-sensitive)
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        if categories.is_empty() {
            return Err(LabelVoteError::config("Category set cannot be empty"));
        }

        let mut index = HashMap::with_capacity(categories.len());
        for (position, category) in categories.iter().enumerate() {
            category.validate_name()?;
            if index.insert(category.name.clone(), position).is_some() {
                return Err(LabelVoteError::config(format!(
                    "Duplicate category name: '{}'",
                    category.name
                )));
            }
        }

        Ok(Self { categories, index })
    }

    /// Load a category set from a JSON file holding a list of categories
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LabelVoteError::config(format!(
                "Failed to read category file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a category set from a JSON list of categories
    pub fn from_json_str(json: &str) -> Result<Self> {
        let categories: Vec<Category> = serde_json::from_str(json)?;
        Self::new(categories)
    }

    /// Look up a category by exact name
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.index.get(name).map(|&i| &self.categories[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Insertion position of a category, used for deterministic ordering
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Categories in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl TryFrom<Vec<Category>> for CategorySet {
    type Error = LabelVoteError;

    fn try_from(categories: Vec<Category>) -> Result<Self> {
        Self::new(categories)
    }
}

impl From<CategorySet> for Vec<Category> {
    fn from(set: CategorySet) -> Self {
        set.categories
    }
}

impl<'a> IntoIterator for &'a CategorySet {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CategorySet {
        CategorySet::new(vec![
            Category::new("debt_not_owed", "The consumer disputes owing the debt"),
            Category::new("billing_error", "Incorrect amount or duplicate charge")
                .with_examples(["I was charged twice this month"]),
            Category::new("other", "Anything else"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_matches_construction() {
        let set = sample();
        for (position, name) in ["debt_not_owed", "billing_error", "other"].iter().enumerate() {
            let category = set.get(name).unwrap();
            assert_eq!(category.name(), *name);
            assert_eq!(set.position(name), Some(position));
        }
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_lookup_not_found() {
        let set = sample();
        assert!(set.get("Debt_Not_Owed").is_none());
        assert!(set.get("").is_none());
        assert!(set.get(UNKNOWN_CATEGORY).is_none());
        assert!(!set.contains("billing"));
    }

    #[test]
    fn test_iteration_preserves_order() {
        let set = sample();
        assert_eq!(set.names(), vec!["debt_not_owed", "billing_error", "other"]);
        let examples: Vec<usize> = set.iter().map(|c| c.examples().len()).collect();
        assert_eq!(examples, vec![0, 1, 0]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = CategorySet::new(vec![
            Category::new("a", "first description"),
            Category::new("a", "a completely different description"),
        ]);
        assert!(matches!(result, Err(LabelVoteError::Config(_))));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let set = CategorySet::new(vec![Category::new("a", ""), Category::new("A", "")]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_invalid_sets_rejected() {
        assert!(CategorySet::new(vec![]).is_err());
        assert!(CategorySet::new(vec![Category::new("   ", "blank")]).is_err());
        assert!(CategorySet::new(vec![Category::new(" padded", "")]).is_err());
        assert!(CategorySet::new(vec![Category::new("two\nlines", "")]).is_err());
        assert!(CategorySet::new(vec![Category::new(UNKNOWN_CATEGORY, "")]).is_err());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[
            {"name": "positive", "description": "Happy customer", "examples": ["Love it"]},
            {"name": "negative", "description": "Unhappy customer"}
        ]"#;
        let set = CategorySet::from_json_str(json).unwrap();
        assert_eq!(set.names(), vec!["positive", "negative"]);
        assert_eq!(set.get("positive").unwrap().examples(), ["Love it".to_string()]);

        let duplicate = r#"[{"name": "x", "description": ""}, {"name": "x", "description": ""}]"#;
        assert!(matches!(
            CategorySet::from_json_str(duplicate),
            Err(LabelVoteError::Config(_))
        ));
    }

    #[test]
    fn test_serde_validates_through_constructor() {
        let set = sample();
        let json = serde_json::to_string(&set).unwrap();
        let back: CategorySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);

        assert!(serde_json::from_str::<CategorySet>("[]").is_err());
    }
}
