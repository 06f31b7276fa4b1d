//! Treebank-style word tokenizer.

/// Characters split off the front of a word.
const LEADING: &[char] = &['"', '\'', '`', '(', '[', '{', '<', '\u{201c}', '\u{2018}'];

/// Characters split off the end of a word.
const TRAILING: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '\'', ')', ']', '}', '>', '\u{201d}', '\u{2019}',
];

/// Contractions split into their own token (`'s`, `n't`, ...).
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

/// Splits text into tokens: whitespace-separated words with surrounding
/// punctuation and English contractions split off.
///
/// Punctuation inside a word (`e-mail`, `3.5`, `U.S`) stays attached.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let chunk = chunk.replace('\u{2019}', "'");
        split_chunk(&chunk, &mut tokens);
    }
    tokens
}

fn split_chunk(chunk: &str, tokens: &mut Vec<String>) {
    let mut word = chunk;

    while let Some(c) = word.chars().next().filter(|c| LEADING.contains(c)) {
        tokens.push(c.to_string());
        word = &word[c.len_utf8()..];
    }

    let mut trailing = Vec::new();
    while let Some(c) = word.chars().next_back().filter(|c| TRAILING.contains(c)) {
        // Plural possessive: the apostrophe stays on the word (teams').
        if c == '\'' && !word.ends_with("''") && word[..word.len() - 1].ends_with('s') {
            break;
        }
        trailing.push(c.to_string());
        word = &word[..word.len() - c.len_utf8()];
    }

    if !word.is_empty() {
        match split_clitic(word) {
            Some((stem, clitic)) => {
                if !stem.is_empty() {
                    tokens.push(stem.to_string());
                }
                tokens.push(clitic.to_string());
            }
            None => tokens.push(word.to_string()),
        }
    }

    tokens.extend(trailing.into_iter().rev());
}

fn split_clitic(word: &str) -> Option<(&str, &str)> {
    let lower = word.to_ascii_lowercase();
    CLITICS.iter().find_map(|clitic| {
        (lower.len() > clitic.len() && lower.ends_with(clitic))
            .then(|| word.split_at(word.len() - clitic.len()))
    })
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
    fn words_and_punctuation() {
        assert_eq!(
            tokenize("I booked a flight, finally!"),
            vec!["I", "booked", "a", "flight", ",", "finally", "!"]
        );
    }

    #[test]
    fn contractions() {
        assert_eq!(tokenize("don't"), vec!["do", "n't"]);
        assert_eq!(tokenize("It's"), vec!["It", "'s"]);
        assert_eq!(tokenize("we'll"), vec!["we", "'ll"]);
        assert_eq!(tokenize("can\u{2019}t"), vec!["ca", "n't"]);
    }

    #[test]
    fn quotes_and_brackets() {
        assert_eq!(
            tokenize("(see \"report\")."),
            vec!["(", "see", "\"", "report", "\"", ")", "."]
        );
    }

    #[test]
    fn inner_punctuation_kept() {
        assert_eq!(tokenize("e-mail 3.5 U.S"), vec!["e-mail", "3.5", "U.S"]);
    }

    #[test]
    fn plural_possessive_apostrophe_kept() {
        assert_eq!(tokenize("the teams' trip"), vec!["the", "teams'", "trip"]);
    }

    #[test]
    fn empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \r\n\t ").is_empty());
    }

    #[test]
    fn lone_punctuation() {
        assert_eq!(tokenize("..."), vec![".", ".", "."]);
    }
}
