//! Category selection from tagged text.

use crate::category::{Category, CategorySet};
use crate::tagger::Tagger;

/// Returns the categories named by common nouns in `text`.
///
/// A token counts only when the tagger marks it `NN` or `NNS` and its
/// lowercase form is exactly a category name. The result is de-duplicated
/// and keeps the order in which categories first appear.
pub fn classify<'a, T>(tagger: &T, text: &str, categories: &'a CategorySet) -> Vec<&'a Category>
where
    T: Tagger + ?Sized,
{
    let mut matched: Vec<&Category> = Vec::new();
    for (word, tag) in tagger.tag(text) {
        if !tag.is_common_noun() {
            continue;
        }
        if let Some(category) = categories.get(&word.to_lowercase())
            && !matched.contains(&category)
        {
            matched.push(category);
        }
    }
    matched
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
    use crate::tagger::PosTag;

    /// Tags every whitespace-separated word with a fixed tag, except words
    /// listed in `overrides`.
    fn fixed(tag: PosTag, overrides: &'static [(&'static str, &'static str)]) -> impl Tagger {
        move |text: &str| -> Vec<(String, PosTag)> {
            text.split_whitespace()
                .map(|w| {
                    let t = overrides
                        .iter()
                        .find(|(word, _)| *word == w)
                        .map_or_else(|| tag.clone(), |(_, t)| PosTag::from_static(t));
                    (w.to_string(), t)
                })
                .collect()
        }
    }

    fn names(matched: &[&Category]) -> Vec<String> {
        matched.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn nouns_in_first_occurrence_order() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NN, &[]);
        let matched = classify(&tagger, "travel work travel personal work", &set);
        assert_eq!(names(&matched), vec!["travel", "work", "personal"]);
    }

    #[test]
    fn case_folded_before_lookup() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NNS, &[]);
        assert_eq!(names(&classify(&tagger, "TRAVEL Work", &set)), vec!["travel", "work"]);
    }

    #[test]
    fn non_noun_tags_never_match() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NN, &[("personal", "JJ"), ("work", "VB"), ("travel", "NNP")]);
        assert!(classify(&tagger, "personal work travel", &set).is_empty());
    }

    #[test]
    fn only_exact_names_match() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NN, &[]);
        assert!(classify(&tagger, "travels working persona", &set).is_empty());
    }

    #[test]
    fn built_in_tagger_skips_verb_uses() {
        let set = CategorySet::default();
        let tagger = crate::tagger::LexiconTagger::new();
        for text in [
            "I want to travel next month.",
            "We work from home on Fridays.",
            "They will work late.",
        ] {
            assert!(classify(&tagger, text, &set).is_empty(), "{text}");
        }
        let matched = classify(&tagger, "Our travel plans changed.", &set);
        assert_eq!(names(&matched), vec!["travel"]);
    }

    #[test]
    fn empty_text() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NN, &[]);
        assert!(classify(&tagger, "", &set).is_empty());
    }

    #[test]
    fn works_through_dyn_tagger() {
        let set = CategorySet::default();
        let tagger = fixed(PosTag::NN, &[]);
        let tagger: &dyn Tagger = &tagger;
        assert_eq!(names(&classify(tagger, "work", &set)), vec!["work"]);
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::tagger::PosTag;

    fn tag_strategy() -> impl Strategy<Value = PosTag> {
        prop_oneof![
            Just(PosTag::NN),
            Just(PosTag::NNS),
            Just(PosTag::NNP),
            Just(PosTag::JJ),
            Just(PosTag::VB),
            Just(PosTag::RB),
        ]
    }

    fn word_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("work".to_string()),
            Just("Personal".to_string()),
            Just("TRAVEL".to_string()),
            Just("trip".to_string()),
            "[a-z]{1,8}",
        ]
    }

    proptest! {
        #[test]
        fn matches_are_exactly_tagged_category_nouns(
            tokens in prop::collection::vec((word_strategy(), tag_strategy()), 0..24)
        ) {
            let set = CategorySet::default();
            let script = tokens.clone();
            let tagger = move |_: &str| -> Vec<(String, PosTag)> { script.clone() };

            let matched = classify(&tagger, "ignored", &set);

            let mut expected: Vec<String> = Vec::new();
            for (word, tag) in &tokens {
                let lower = word.to_lowercase();
                if tag.is_common_noun() && set.contains(&lower) && !expected.contains(&lower) {
                    expected.push(lower);
                }
            }
            let got: Vec<String> = matched.iter().map(ToString::to_string).collect();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn result_has_no_duplicates(
            tokens in prop::collection::vec((word_strategy(), tag_strategy()), 0..24)
        ) {
            let set = CategorySet::default();
            let tagger = move |_: &str| -> Vec<(String, PosTag)> { tokens.clone() };
            let matched = classify(&tagger, "", &set);
            let mut deduped = matched.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), matched.len());
            prop_assert!(matched.len() <= set.len());
        }
    }
}
