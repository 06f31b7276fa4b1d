//! Command tag generator.

use crate::types::Tag;

/// Produces sequential command tags (`A0001`, `A0002`, ...).
///
/// One generator lives for the whole connection, so tags never repeat
/// within a session.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag.
    pub fn next_tag(&mut self) -> Tag {
        self.counter = self.counter.wrapping_add(1);
        Tag::new(format!("{}{:04}", self.prefix, self.counter))
    }

    /// Number of tags issued so far.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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
    fn tags_are_sequential() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag().as_str(), "A0001");
        assert_eq!(tags.next_tag().as_str(), "A0002");
        assert_eq!(tags.issued(), 2);
    }

    #[test]
    fn custom_prefix() {
        let mut tags = TagGenerator::new('M');
        assert_eq!(tags.next_tag().as_str(), "M0001");
    }

    #[test]
    fn wide_counter_keeps_digits() {
        let mut tags = TagGenerator::default();
        for _ in 0..12_344 {
            let _ = tags.next_tag();
        }
        assert_eq!(tags.next_tag().as_str(), "A12345");
    }
}
