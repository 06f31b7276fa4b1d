//! MIME header handling.

use crate::encoding::decode_rfc2047;

/// Header fields of a message or body part, in the order they appeared.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the raw value of the first field with this name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the first value for a header with RFC 2047 encoded-words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Returns true if a field with this name is present, even if empty.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses the header block at the start of `raw` and returns it with
    /// the body that follows the first empty line.
    ///
    /// Folded lines are unfolded. Lines without a colon are dropped. A
    /// message with no empty line is all headers and an empty body.
    #[must_use]
    pub fn parse(raw: &[u8]) -> (Self, &[u8]) {
        let (block, body) = split_header_body(raw);
        let text = String::from_utf8_lossy(block);

        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }
            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        (headers, body)
    }
}

/// Splits at the first empty line. The empty line belongs to neither half.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < raw.len() {
        let next = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i + 1);
        let line = &raw[pos..next];
        if line == b"\n" || line == b"\r\n" {
            return (&raw[..pos], &raw[next..]);
        }
        pos = next;
    }
    (raw, &[])
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
    fn parse_and_split_body() {
        let raw = b"From: a@example.com\r\nSubject: Hi\r\n\r\nbody line\r\n";
        let (headers, body) = Headers::parse(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("from"), Some("a@example.com"));
        assert_eq!(headers.get("SUBJECT"), Some("Hi"));
        assert_eq!(body, b"body line\r\n");
    }

    #[test]
    fn bare_lf_line_endings() {
        let (headers, body) = Headers::parse(b"Subject: x\n\nhello");
        assert_eq!(headers.get("subject"), Some("x"));
        assert_eq!(body, b"hello");
    }

    #[test]
    fn folded_value_unfolded() {
        let raw = b"Subject: a very\r\n\tlong subject\r\nTo: b\r\n\r\n";
        let (headers, _) = Headers::parse(raw);
        assert_eq!(headers.get("subject"), Some("a very long subject"));
        assert_eq!(headers.get("to"), Some("b"));
    }

    #[test]
    fn first_occurrence_wins_and_order_kept() {
        let (headers, _) = Headers::parse(b"Received: one\r\nReceived: two\r\n\r\n");
        assert_eq!(headers.get("received"), Some("one"));
        let values: Vec<_> = headers.iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["one", "two"]);
    }

    #[test]
    fn no_blank_line_means_no_body() {
        let (headers, body) = Headers::parse(b"Subject: only headers");
        assert_eq!(headers.get("subject"), Some("only headers"));
        assert!(body.is_empty());
    }

    #[test]
    fn leading_blank_line_means_no_headers() {
        let (headers, body) = Headers::parse(b"\r\njust a body");
        assert!(headers.is_empty());
        assert_eq!(body, b"just a body");
    }

    #[test]
    fn empty_value_still_present() {
        let (headers, _) = Headers::parse(b"Content-Disposition:\r\n\r\n");
        assert!(headers.contains("content-disposition"));
        assert_eq!(headers.get("content-disposition"), Some(""));
    }

    #[test]
    fn decoded_subject() {
        let (headers, _) = Headers::parse(b"Subject: =?UTF-8?B?w6l0w6k=?=\r\n\r\n");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("été"));
    }

    #[test]
    fn eight_bit_header_is_lossy() {
        let (headers, _) = Headers::parse(b"Subject: caf\xe9\r\n\r\n");
        assert_eq!(headers.get("subject"), Some("caf\u{fffd}"));
    }
}
