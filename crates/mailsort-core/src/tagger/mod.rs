//! Part-of-speech tagging.
//!
//! Classification only needs to know which words are common nouns, so the
//! tagger is a seam: [`LexiconTagger`] is the built-in heuristic, and any
//! `Fn(&str) -> Vec<(String, PosTag)>` works as a tagger too.

mod lexicon;
mod tokenize;

pub use lexicon::LexiconTagger;
pub use tokenize::tokenize;

use std::borrow::Cow;
use std::fmt;

/// Penn Treebank part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PosTag(Cow<'static, str>);

impl PosTag {
    /// Noun, singular or mass.
    pub const NN: Self = Self::from_static("NN");
    /// Noun, plural.
    pub const NNS: Self = Self::from_static("NNS");
    /// Proper noun, singular.
    pub const NNP: Self = Self::from_static("NNP");
    /// Adjective.
    pub const JJ: Self = Self::from_static("JJ");
    /// Adverb.
    pub const RB: Self = Self::from_static("RB");
    /// Verb, base form.
    pub const VB: Self = Self::from_static("VB");
    /// Verb, non-3rd person singular present.
    pub const VBP: Self = Self::from_static("VBP");
    /// Verb, past tense.
    pub const VBD: Self = Self::from_static("VBD");
    /// Verb, gerund or present participle.
    pub const VBG: Self = Self::from_static("VBG");
    /// Cardinal number.
    pub const CD: Self = Self::from_static("CD");

    /// Tag from a static string.
    #[must_use]
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Tag from any string, e.g. the output of an external tagger.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `NN` and `NNS`, the only tags that can select a category.
    #[must_use]
    pub fn is_common_noun(&self) -> bool {
        matches!(self.as_str(), "NN" | "NNS")
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits text into words and tags each one.
pub trait Tagger {
    /// Returns `(token, tag)` pairs in text order.
    fn tag(&self, text: &str) -> Vec<(String, PosTag)>;
}

impl<F> Tagger for F
where
    F: Fn(&str) -> Vec<(String, PosTag)>,
{
    fn tag(&self, text: &str) -> Vec<(String, PosTag)> {
        self(text)
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
    fn common_nouns() {
        assert!(PosTag::NN.is_common_noun());
        assert!(PosTag::NNS.is_common_noun());
        assert!(PosTag::new("NN").is_common_noun());
        assert!(!PosTag::NNP.is_common_noun());
        assert!(!PosTag::JJ.is_common_noun());
        assert!(!PosTag::new("nn").is_common_noun());
    }

    #[test]
    fn static_and_owned_tags_compare_equal() {
        assert_eq!(PosTag::new("VBD"), PosTag::VBD);
        assert_eq!(PosTag::NNS.to_string(), "NNS");
    }

    #[test]
    fn closures_are_taggers() {
        let tagger = |text: &str| -> Vec<(String, PosTag)> {
            text.split_whitespace()
                .map(|w| (w.to_string(), PosTag::NN))
                .collect()
        };
        assert_eq!(
            tagger.tag("a b"),
            vec![("a".to_string(), PosTag::NN), ("b".to_string(), PosTag::NN)]
        );
    }
}
