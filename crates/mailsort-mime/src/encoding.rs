//! Transfer-encoding and header-word decoding.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded-words.

use crate::charset;
use crate::error::Result;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine that tolerates missing padding and stray trailing bits,
/// both common in mail bodies.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64 data, skipping line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the remaining characters are not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT.decode(compact).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Malformed escapes are kept as-is rather than rejected.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        match (data.get(i + 1), data.get(i + 2)) {
            // Soft line breaks
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'=');
                    i += 1;
                }
            },
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes the "Q" encoding used inside encoded-words.
fn decode_q(text: &str) -> Vec<u8> {
    let replaced: Vec<u8> = text
        .bytes()
        .map(|b| if b == b'_' { b' ' } else { b })
        .collect();
    decode_quoted_printable(&replaced)
}

/// Decodes a header value containing RFC 2047 encoded-words.
///
/// Format: `=?charset?encoding?encoded-text?=`
///
/// Whitespace between two adjacent encoded-words is dropped. Words that
/// cannot be decoded are left in the output verbatim.
///
/// # Example
///
/// ```
/// use mailsort_mime::encoding::decode_rfc2047;
///
/// assert_eq!(decode_rfc2047("=?UTF-8?Q?caf=C3=A9?= menu"), "café menu");
/// ```
#[must_use]
pub fn decode_rfc2047(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    // Whitespace seen since the last encoded-word, held back in case
    // another encoded-word follows.
    let mut pending_space: Option<&str> = None;
    let mut last_was_word = false;

    while !rest.is_empty() {
        let Some(start) = rest.find("=?") else {
            flush_plain(&mut out, &mut pending_space, rest);
            break;
        };

        let (before, candidate) = rest.split_at(start);
        match parse_encoded_word(candidate) {
            Some((decoded, consumed)) => {
                if last_was_word && before.trim().is_empty() {
                    // Adjacent encoded-words: the gap between them is not text.
                    pending_space = None;
                } else {
                    flush_plain(&mut out, &mut pending_space, before);
                }
                out.push_str(&decoded);
                last_was_word = true;
                rest = &candidate[consumed..];

                let trimmed = rest.trim_start_matches([' ', '\t', '\r', '\n']);
                let gap = &rest[..rest.len() - trimmed.len()];
                if !gap.is_empty() {
                    pending_space = Some(gap);
                }
                rest = trimmed;
            }
            None => {
                flush_plain(&mut out, &mut pending_space, before);
                out.push_str("=?");
                last_was_word = false;
                rest = &candidate[2..];
            }
        }
    }

    if let Some(space) = pending_space {
        out.push_str(space);
    }
    out
}

fn flush_plain(out: &mut String, pending_space: &mut Option<&str>, text: &str) {
    if let Some(space) = pending_space.take() {
        out.push_str(space);
    }
    out.push_str(text);
}

/// Parses one encoded-word at the start of `s`.
///
/// Returns the decoded text and the number of bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let body = s.strip_prefix("=?")?;
    let (charset, body) = body.split_once('?')?;
    let (encoding, body) = body.split_once('?')?;
    let end = body.find("?=")?;
    let text = &body[..end];

    if charset.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(text.as_bytes()).ok()?,
        "Q" | "q" => decode_q(text),
        _ => return None,
    };

    // RFC 2231 allows a language suffix: `utf-8*en`
    let charset = charset.split('*').next().unwrap_or(charset);
    let consumed = s.len() - body.len() + end + 2;
    Some((charset::decode_lossy(&bytes, charset), consumed))
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
    fn base64_ignores_line_breaks() {
        let decoded = decode_base64(b"SGVs\r\nbG8s\r\nIFdv\ncmxk").unwrap();
        assert_eq!(decoded, b"Hello, World");
    }

    #[test]
    fn base64_without_padding() {
        assert_eq!(decode_base64(b"aGk").unwrap(), b"hi");
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(decode_base64(b"@@@@").is_err());
    }

    #[test]
    fn quoted_printable_soft_breaks_and_escapes() {
        let decoded = decode_quoted_printable(b"caf=C3=A9 au =\r\nlait=\nx");
        assert_eq!(decoded, "café au laitx".as_bytes());
    }

    #[test]
    fn quoted_printable_keeps_malformed_escape() {
        assert_eq!(decode_quoted_printable(b"a=ZZb="), b"a=ZZb=");
        assert_eq!(decode_quoted_printable(b"x=3dy"), b"x=y");
    }

    #[test]
    fn rfc2047_plain_text_untouched() {
        assert_eq!(decode_rfc2047("Quarterly report"), "Quarterly report");
    }

    #[test]
    fn rfc2047_base64_word() {
        assert_eq!(decode_rfc2047("=?UTF-8?B?SGVsbG8gV29ybGQ=?="), "Hello World");
    }

    #[test]
    fn rfc2047_q_word_with_underscores() {
        assert_eq!(decode_rfc2047("=?utf-8?q?flight_to_Paris?="), "flight to Paris");
    }

    #[test]
    fn rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?UTF-8?Q?Tr=C3=A8s?= \r\n =?UTF-8?Q?_bien?="),
            "Très bien"
        );
    }

    #[test]
    fn rfc2047_mixed_with_plain_text() {
        assert_eq!(
            decode_rfc2047("Re: =?ISO-8859-1?Q?caf=E9?= menu"),
            "Re: café menu"
        );
    }

    #[test]
    fn rfc2047_mixed_charsets() {
        assert_eq!(
            decode_rfc2047("=?ISO-8859-1?Q?=E9t=E9?= =?UTF-8?B?w6l0w6k=?="),
            "étéété"
        );
    }

    #[test]
    fn rfc2047_language_suffix() {
        assert_eq!(decode_rfc2047("=?UTF-8*en?Q?hello?="), "hello");
    }

    #[test]
    fn rfc2047_malformed_word_kept() {
        assert_eq!(decode_rfc2047("price =? unknown"), "price =? unknown");
        assert_eq!(decode_rfc2047("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
    }

    #[test]
    fn rfc2047_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_rfc2047("=?x-made-up?Q?ok?="), "ok");
    }
}
