//! Category names: both the label applied on the server and the directory
//! attachments are saved into.

use std::fmt;

use crate::config::{ValidationError, category_errors};

/// One category, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    /// Returns the category name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fixed, ordered set of categories. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    /// Categories used when none are configured.
    pub const DEFAULT: [&'static str; 3] = ["work", "personal", "travel"];

    /// Builds a set, rejecting empty, duplicate, non-lowercase, or
    /// path-like names.
    ///
    /// # Errors
    ///
    /// Returns every validation error found.
    pub fn new<I, S>(names: I) -> Result<Self, Vec<ValidationError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let errors = category_errors(&names);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            categories: names.into_iter().map(Category).collect(),
        })
    }

    /// Looks up a word. Matching is exact: callers lowercase first.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.0 == word)
    }

    /// Returns true if `word` is a category.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// Categories in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            categories: Self::DEFAULT
                .iter()
                .map(|name| Category((*name).to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn default_set_order() {
        let set = CategorySet::default();
        let names: Vec<_> = set.iter().map(Category::as_str).collect();
        assert_eq!(names, vec!["work", "personal", "travel"]);
    }

    #[test]
    fn exact_lookup() {
        let set = CategorySet::new(["travel", "bills"]).unwrap();
        assert_eq!(set.get("travel").map(Category::as_str), Some("travel"));
        assert!(!set.contains("Travel"));
        assert!(!set.contains("trave"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn rejects_bad_names() {
        let errors = CategorySet::new(["ok", "Bad", "ok"]).unwrap_err();
        assert!(errors.contains(&ValidationError::NotLowercase("Bad".into())));
        assert!(errors.contains(&ValidationError::DuplicateCategory("ok".into())));
        assert!(CategorySet::new(Vec::<String>::new()).is_err());
    }
}
