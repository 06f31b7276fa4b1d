//! Command serialization helpers.

use crate::types::Mailbox;

use super::{FetchAttribute, StoreAction};

/// Writes an astring (atom or quoted string).
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a mailbox name.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, mailbox.as_str());
}

/// Returns true if the byte cannot appear in a bare atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized FETCH attribute list (a single item goes bare).
pub fn write_fetch_attributes(buf: &mut Vec<u8>, attrs: &[FetchAttribute]) {
    if let [single] = attrs {
        write_fetch_attribute(buf, single);
        return;
    }
    buf.push(b'(');
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write_fetch_attribute(buf, attr);
    }
    buf.push(b')');
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::GmailLabels => buf.extend_from_slice(b"X-GM-LABELS"),
        FetchAttribute::Body { section, peek } => {
            buf.extend_from_slice(if *peek { b"BODY.PEEK[" } else { b"BODY[" });
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
        }
    }
}

/// Writes the data item and value list of a STORE.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction) {
    match action {
        StoreAction::AddFlags(flags) => {
            buf.extend_from_slice(b"+FLAGS (");
            for (i, flag) in flags.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                buf.extend_from_slice(flag.as_str().as_bytes());
            }
            buf.push(b')');
        }
        StoreAction::AddGmailLabels(labels) => {
            buf.extend_from_slice(b"+X-GM-LABELS (");
            for (i, label) in labels.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_astring(buf, label);
            }
            buf.push(b')');
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

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn atom_stays_bare() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("travel"), "travel");
    }

    #[test]
    fn specials_get_quoted_and_escaped() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("[Gmail]/All Mail"), "\"[Gmail]/All Mail\"");
        assert_eq!(astring("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn body_peek_section() {
        let mut buf = Vec::new();
        write_fetch_attribute(
            &mut buf,
            &FetchAttribute::Body {
                section: None,
                peek: true,
            },
        );
        assert_eq!(buf, b"BODY.PEEK[]");
    }
}
