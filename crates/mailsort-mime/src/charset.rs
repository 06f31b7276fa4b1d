//! Charset decoding backed by `encoding_rs`.
//!
//! Labels follow the WHATWG Encoding Standard, which covers the names mail
//! clients put in `charset=` parameters (`us-ascii` maps to windows-1252).

use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8};

/// Looks up an encoding by its charset label.
fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().trim_matches('"').as_bytes())
}

/// Decodes `bytes` in the given charset, failing on malformed input.
///
/// `None` means no charset was declared; UTF-8 is assumed.
///
/// # Errors
///
/// Returns [`Error::UnknownCharset`] if the label is not recognized and
/// [`Error::MalformedText`] if the bytes are not valid in that charset.
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> Result<String> {
    let encoding = match charset {
        None => UTF_8,
        Some(label) => lookup(label).ok_or_else(|| Error::UnknownCharset(label.to_string()))?,
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| Error::MalformedText {
            charset: encoding.name().to_string(),
        })
}

/// Decodes `bytes` in the given charset, substituting U+FFFD for anything
/// that does not decode. Unknown labels fall back to UTF-8.
#[must_use]
pub fn decode_lossy(bytes: &[u8], charset: &str) -> String {
    let encoding = lookup(charset).unwrap_or(UTF_8);
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
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
    fn default_is_utf8() {
        assert_eq!(decode_text("naïve".as_bytes(), None).unwrap(), "naïve");
    }

    #[test]
    fn latin1_label() {
        assert_eq!(decode_text(b"caf\xe9", Some("ISO-8859-1")).unwrap(), "café");
        assert_eq!(decode_text(b"caf\xe9", Some("\"latin1\"")).unwrap(), "café");
    }

    #[test]
    fn malformed_utf8_is_error() {
        let err = decode_text(b"caf\xe9", Some("utf-8")).unwrap_err();
        assert!(matches!(err, Error::MalformedText { ref charset } if charset == "UTF-8"));
    }

    #[test]
    fn unknown_label_is_error() {
        assert!(matches!(
            decode_text(b"abc", Some("x-klingon")),
            Err(Error::UnknownCharset(label)) if label == "x-klingon"
        ));
    }

    #[test]
    fn lossy_replaces_and_falls_back() {
        assert_eq!(decode_lossy(b"caf\xe9", "utf-8"), "caf\u{fffd}");
        assert_eq!(decode_lossy(b"plain", "x-klingon"), "plain");
    }
}
