//! Heuristic tagger: closed-class lexicon plus suffix rules.
//!
//! It does not try to match a trained model. What it needs to get right is
//! the split between common nouns and everything else for ordinary English
//! mail text.

use std::collections::HashMap;

use super::{PosTag, Tagger, tokenize};

/// Closed-class words and a few frequent open-class ones.
const LEXICON: &[(&str, &str)] = &[
    // Determiners
    ("the", "DT"), ("a", "DT"), ("an", "DT"), ("this", "DT"), ("that", "DT"),
    ("these", "DT"), ("those", "DT"), ("every", "DT"), ("each", "DT"),
    ("some", "DT"), ("any", "DT"), ("no", "DT"), ("all", "DT"), ("both", "DT"),
    ("either", "DT"), ("neither", "DT"), ("another", "DT"),
    // Pronouns
    ("i", "PRP"), ("you", "PRP"), ("he", "PRP"), ("she", "PRP"), ("it", "PRP"),
    ("we", "PRP"), ("they", "PRP"), ("me", "PRP"), ("him", "PRP"), ("us", "PRP"),
    ("them", "PRP"), ("myself", "PRP"), ("yourself", "PRP"), ("itself", "PRP"),
    ("my", "PRP$"), ("your", "PRP$"), ("his", "PRP$"), ("her", "PRP$"),
    ("its", "PRP$"), ("our", "PRP$"), ("their", "PRP$"),
    ("who", "WP"), ("whom", "WP"), ("what", "WP"), ("which", "WDT"),
    ("when", "WRB"), ("where", "WRB"), ("why", "WRB"), ("how", "WRB"),
    ("there", "EX"),
    // Prepositions and subordinators
    ("of", "IN"), ("in", "IN"), ("on", "IN"), ("at", "IN"), ("by", "IN"),
    ("for", "IN"), ("with", "IN"), ("about", "IN"), ("against", "IN"),
    ("between", "IN"), ("into", "IN"), ("through", "IN"), ("during", "IN"),
    ("before", "IN"), ("after", "IN"), ("above", "IN"), ("below", "IN"),
    ("from", "IN"), ("over", "IN"), ("under", "IN"), ("than", "IN"),
    ("as", "IN"), ("since", "IN"), ("until", "IN"), ("while", "IN"),
    ("because", "IN"), ("if", "IN"), ("although", "IN"), ("though", "IN"),
    ("per", "IN"), ("via", "IN"), ("without", "IN"), ("within", "IN"),
    ("to", "TO"),
    // Conjunctions
    ("and", "CC"), ("or", "CC"), ("but", "CC"), ("nor", "CC"), ("yet", "CC"),
    // Modals
    ("can", "MD"), ("could", "MD"), ("may", "MD"), ("might", "MD"),
    ("must", "MD"), ("shall", "MD"), ("should", "MD"), ("will", "MD"),
    ("would", "MD"), ("ca", "MD"), ("wo", "MD"), ("'ll", "MD"), ("'d", "MD"),
    // Auxiliaries
    ("be", "VB"), ("am", "VBP"), ("are", "VBP"), ("is", "VBZ"), ("was", "VBD"),
    ("were", "VBD"), ("been", "VBN"), ("being", "VBG"), ("have", "VBP"),
    ("has", "VBZ"), ("had", "VBD"), ("do", "VBP"), ("does", "VBZ"),
    ("did", "VBD"), ("'re", "VBP"), ("'ve", "VBP"), ("'m", "VBP"),
    ("'s", "POS"), ("n't", "RB"), ("not", "RB"),
    // Frequent verbs
    ("get", "VB"), ("got", "VBD"), ("make", "VB"), ("made", "VBD"),
    ("go", "VB"), ("went", "VBD"), ("gone", "VBN"), ("know", "VB"),
    ("knew", "VBD"), ("take", "VB"), ("took", "VBD"), ("see", "VB"),
    ("saw", "VBD"), ("come", "VB"), ("came", "VBD"), ("think", "VB"),
    ("thought", "VBD"), ("want", "VB"), ("give", "VB"), ("gave", "VBD"),
    ("find", "VB"), ("found", "VBD"), ("tell", "VB"), ("told", "VBD"),
    ("send", "VB"), ("sent", "VBD"), ("let", "VB"), ("keep", "VB"),
    ("kept", "VBD"), ("attached", "VBN"),
    // Adjectives
    ("good", "JJ"), ("new", "JJ"), ("first", "JJ"), ("last", "JJ"),
    ("long", "JJ"), ("great", "JJ"), ("little", "JJ"), ("own", "JJ"),
    ("other", "JJ"), ("old", "JJ"), ("big", "JJ"), ("high", "JJ"),
    ("small", "JJ"), ("large", "JJ"), ("next", "JJ"), ("young", "JJ"),
    ("few", "JJ"), ("bad", "JJ"), ("same", "JJ"), ("quarterly", "JJ"),
    ("weekly", "JJ"), ("monthly", "JJ"), ("daily", "JJ"), ("early", "JJ"),
    // Adverbs
    ("very", "RB"), ("also", "RB"), ("just", "RB"), ("only", "RB"),
    ("too", "RB"), ("well", "RB"), ("even", "RB"), ("here", "RB"),
    ("now", "RB"), ("then", "RB"), ("still", "RB"), ("never", "RB"),
    ("always", "RB"), ("often", "RB"), ("soon", "RB"), ("already", "RB"),
    ("please", "UH"), ("thanks", "UH"), ("hi", "UH"), ("hello", "UH"),
];

/// Pronouns that can be the subject of a present-tense verb.
const SUBJECT_PRONOUNS: &[&str] = &["i", "you", "we", "they"];

/// Rule-based tagger for English text.
///
/// Order of decisions for each token: punctuation, numbers, the lexicon,
/// capitalised words after the sentence start (`NNP`), suffix rules, and
/// finally `NN`. A would-be `NN` right after `to`, a modal or a subject
/// pronoun is tagged as a verb instead.
#[derive(Debug, Clone)]
pub struct LexiconTagger {
    lexicon: HashMap<&'static str, &'static str>,
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconTagger {
    /// Creates a tagger with the built-in lexicon.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    fn tag_word(
        &self,
        word: &str,
        sentence_start: bool,
        previous: Option<&(String, PosTag)>,
    ) -> PosTag {
        if let Some(tag) = punctuation_tag(word) {
            return PosTag::from_static(tag);
        }
        if is_number(word) {
            return PosTag::CD;
        }

        let lower = word.to_lowercase();
        if let Some(&tag) = self.lexicon.get(lower.as_str()) {
            return PosTag::from_static(tag);
        }

        if !sentence_start && word.chars().next().is_some_and(char::is_uppercase) {
            return PosTag::NNP;
        }

        let tag = suffix_tag(&lower);
        if tag == PosTag::NN
            && let Some(verb) = previous.and_then(verb_after)
        {
            return verb;
        }
        tag
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, text: &str) -> Vec<(String, PosTag)> {
        let mut tagged: Vec<(String, PosTag)> = Vec::new();
        let mut sentence_start = true;
        for token in tokenize(text) {
            let tag = self.tag_word(&token, sentence_start, tagged.last());
            sentence_start = matches!(token.as_str(), "." | "!" | "?");
            tagged.push((token, tag));
        }
        tagged
    }
}

/// Verb tag for a base-form word following `(word, tag)`, if that token
/// expects a verb next.
fn verb_after((word, tag): &(String, PosTag)) -> Option<PosTag> {
    match tag.as_str() {
        "TO" | "MD" => Some(PosTag::VB),
        "PRP" if SUBJECT_PRONOUNS.contains(&word.to_lowercase().as_str()) => Some(PosTag::VBP),
        _ => None,
    }
}

fn punctuation_tag(token: &str) -> Option<&'static str> {
    if token.chars().any(char::is_alphanumeric) {
        return None;
    }
    Some(match token {
        "." | "!" | "?" => ".",
        "," => ",",
        ";" | ":" | "-" | "--" => ":",
        "\"" | "`" | "\u{201c}" | "\u{2018}" => "``",
        "'" | "\u{201d}" => "''",
        "(" | "[" | "{" | "<" => "-LRB-",
        ")" | "]" | "}" | ">" => "-RRB-",
        "$" => "$",
        "#" => "#",
        _ => "SYM",
    })
}

fn is_number(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '/' | ':'))
}

fn suffix_tag(lower: &str) -> PosTag {
    let len = lower.chars().count();

    if len > 4 && lower.ends_with("ly") {
        return PosTag::RB;
    }
    if len > 5 && lower.ends_with("ing") {
        return PosTag::VBG;
    }
    if len > 4 && lower.ends_with("ed") {
        return PosTag::VBD;
    }
    if len > 4
        && ["ous", "ful", "ive", "able", "al"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
    {
        return PosTag::JJ;
    }
    if len > 3
        && lower.ends_with('s')
        && !["ss", "us", "is"].iter().any(|suffix| lower.ends_with(suffix))
    {
        return PosTag::NNS;
    }
    PosTag::NN
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

    fn tags(text: &str) -> Vec<(String, String)> {
        LexiconTagger::new()
            .tag(text)
            .into_iter()
            .map(|(word, tag)| (word, tag.to_string()))
            .collect()
    }

    fn tag_of(text: &str, word: &str) -> String {
        tags(text)
            .into_iter()
            .find(|(w, _)| w == word)
            .map(|(_, t)| t)
            .unwrap()
    }

    #[test]
    fn travel_sentence() {
        let tagged = tags("I booked a flight for my trip.");
        let expected = [
            ("I", "PRP"),
            ("booked", "VBD"),
            ("a", "DT"),
            ("flight", "NN"),
            ("for", "IN"),
            ("my", "PRP$"),
            ("trip", "NN"),
            (".", "."),
        ];
        let expected: Vec<_> = expected
            .iter()
            .map(|(w, t)| ((*w).to_string(), (*t).to_string()))
            .collect();
        assert_eq!(tagged, expected);
    }

    #[test]
    fn plural_nouns() {
        assert_eq!(tag_of("See the receipts", "receipts"), "NNS");
        assert_eq!(tag_of("the business plan", "business"), "NN");
        assert_eq!(tag_of("this bus", "bus"), "NN");
    }

    #[test]
    fn suffix_rules() {
        assert_eq!(tag_of("we are meeting", "meeting"), "VBG");
        assert_eq!(tag_of("a wonderful day", "wonderful"), "JJ");
        assert_eq!(tag_of("my personal trip", "personal"), "JJ");
        assert_eq!(tag_of("arrived safely", "safely"), "RB");
        assert_eq!(tag_of("the quarterly report", "quarterly"), "JJ");
    }

    #[test]
    fn proper_nouns_after_sentence_start() {
        assert_eq!(tag_of("We fly to Paris", "Paris"), "NNP");
        assert_eq!(tag_of("Work is busy", "Work"), "NN");
        assert_eq!(tag_of("Done. Travel is fun", "Travel"), "NN");
    }

    #[test]
    fn numbers_and_punctuation() {
        assert_eq!(tag_of("flight 370 departs", "370"), "CD");
        assert_eq!(tag_of("on 12/05", "12/05"), "CD");
        assert_eq!(tag_of("yes, no", ","), ",");
        assert_eq!(tag_of("(aside)", "("), "-LRB-");
    }

    #[test]
    fn contractions() {
        let tagged = tags("don't");
        assert_eq!(
            tagged,
            vec![
                ("do".to_string(), "VBP".to_string()),
                ("n't".to_string(), "RB".to_string())
            ]
        );
    }

    #[test]
    fn base_form_after_to_is_a_verb() {
        assert_eq!(tag_of("I want to travel next month.", "travel"), "VB");
        assert_eq!(tag_of("the travel budget", "travel"), "NN");
    }

    #[test]
    fn base_form_after_subject_pronoun_is_a_verb() {
        assert_eq!(tag_of("We work from home on Fridays.", "work"), "VBP");
        assert_eq!(tag_of("Do you travel often?", "travel"), "VBP");
        assert_eq!(tag_of("send them work", "work"), "NN");
    }

    #[test]
    fn base_form_after_modal_is_a_verb() {
        assert_eq!(tag_of("They will work late.", "work"), "VB");
        assert_eq!(tag_of("the work is done", "work"), "NN");
    }

    #[test]
    fn empty_text() {
        assert!(tags("").is_empty());
    }
}
