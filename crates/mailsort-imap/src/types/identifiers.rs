//! Tags and message sequence numbers.

use std::num::NonZeroU32;

/// IMAP command tag.
///
/// Each command carries a unique tag and the server echoes it in the
/// completion response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a new tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message sequence number.
///
/// Assigned from 1 upwards within the selected mailbox; zero is never a
/// valid message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a new sequence number.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
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
    fn tag_display() {
        assert_eq!(Tag::new("A0001").to_string(), "A0001");
        assert_eq!(Tag::new("A0001"), Tag::new(String::from("A0001")));
    }

    #[test]
    fn seq_num_rejects_zero() {
        assert!(SeqNum::new(0).is_none());
        assert_eq!(SeqNum::new(u32::MAX).unwrap().get(), u32::MAX);
    }

    #[test]
    fn seq_num_order_and_display() {
        let a = SeqNum::new(2).unwrap();
        let b = SeqNum::new(10).unwrap();
        assert!(a < b);
        assert_eq!(format!("{b}"), "10");
    }
}
