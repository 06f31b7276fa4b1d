//! MIME message structure and handling.

use crate::charset::decode_text;
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Maximum multipart nesting depth accepted by [`Message::parse`].
pub const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    ///
    /// Unrecognized values are treated as identity, like 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Undoes this transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if a Base64 body cannot be decoded.
    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(body),
            Self::QuotedPrintable => Ok(decode_quoted_printable(body)),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(body.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A leaf body part: anything that is not a multipart container.
#[derive(Debug, Clone)]
pub struct Part {
    headers: Headers,
    content_type: ContentType,
    body: Vec<u8>,
}

impl Part {
    fn new(headers: Headers, default_type: ContentType, body: &[u8]) -> Self {
        let content_type = headers
            .get("content-type")
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or(default_type);
        Self {
            headers,
            content_type,
            body: body.to_vec(),
        }
    }

    /// Part headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The effective content type (the default when the header is missing
    /// or unparseable).
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// `type/subtype`, lowercased.
    #[must_use]
    pub fn media_type(&self) -> String {
        self.content_type.mime_type()
    }

    /// Undecoded body bytes.
    #[must_use]
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Body with the transfer encoding removed.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decoded_body(&self) -> Result<Vec<u8>> {
        self.transfer_encoding().decode(&self.body)
    }

    /// Body decoded to text in the declared charset (UTF-8 if none).
    ///
    /// # Errors
    ///
    /// Returns an error if transfer decoding fails, the charset is unknown,
    /// or the bytes are not valid in it.
    pub fn text(&self) -> Result<String> {
        decode_text(&self.decoded_body()?, self.content_type.charset())
    }

    /// Parsed Content-Disposition, if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Returns true if the part carries a Content-Disposition header.
    #[must_use]
    pub fn has_disposition(&self) -> bool {
        self.headers.contains("content-disposition")
    }

    /// Attachment filename: the disposition's `filename`, falling back to
    /// the content type's `name`. Encoded-words are decoded.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let disposition = self.disposition();
        disposition
            .as_ref()
            .and_then(ContentDisposition::filename)
            .or_else(|| self.content_type.parameter("name"))
            .map(decode_rfc2047)
            .filter(|name| !name.trim().is_empty())
    }

    /// Returns true for parts that would be saved as attachments: a
    /// Content-Disposition header is present and a filename is known.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.has_disposition() && self.filename().is_some()
    }
}

/// Parsed MIME message: top-level headers plus the leaf parts found by a
/// depth-first walk, in document order.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    parts: Vec<Part>,
}

impl Message {
    /// Parses a raw RFC 5322 message.
    ///
    /// Multipart containers are descended into; a multipart without a
    /// usable boundary is kept as a single leaf. Any input yields at least
    /// one part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooDeep`] if multiparts nest beyond [`MAX_DEPTH`].
    ///
    /// # Example
    ///
    /// ```
    /// use mailsort_mime::Message;
    ///
    /// let raw = b"Subject: Hello\r\nContent-Type: text/plain\r\n\r\nHi there";
    /// let message = Message::parse(raw).unwrap();
    /// assert_eq!(message.subject().as_deref(), Some("Hello"));
    /// assert_eq!(message.plain_text().unwrap(), "Hi there");
    /// ```
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (headers, _) = Headers::parse(raw);
        let mut parts = Vec::new();
        collect_parts(raw, ContentType::text_plain(), 0, &mut parts)?;
        Ok(Self { headers, parts })
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("subject")
    }

    /// Leaf parts in document order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Concatenation of every `text/plain` part, attachments included, in
    /// document order with nothing inserted between them.
    ///
    /// # Errors
    ///
    /// Returns an error if any such part fails to decode.
    pub fn plain_text(&self) -> Result<String> {
        let mut text = String::new();
        for part in self.parts.iter().filter(|p| p.content_type.is_text_plain()) {
            text.push_str(&part.text()?);
        }
        Ok(text)
    }

    /// Parts that look like attachments (see [`Part::is_attachment`]).
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_attachment())
    }
}

fn collect_parts(
    raw: &[u8],
    default_type: ContentType,
    depth: usize,
    out: &mut Vec<Part>,
) -> Result<()> {
    let (headers, body) = Headers::parse(raw);
    let part = Part::new(headers, default_type, body);

    let boundary = part
        .content_type
        .boundary()
        .filter(|_| part.content_type.is_multipart())
        .map(str::to_owned);
    let Some(boundary) = boundary else {
        out.push(part);
        return Ok(());
    };

    if depth >= MAX_DEPTH {
        return Err(Error::TooDeep(MAX_DEPTH));
    }

    let child_default = if part.content_type.sub_type == "digest" {
        ContentType::message_rfc822()
    } else {
        ContentType::text_plain()
    };
    for chunk in split_multipart(body, &boundary) {
        collect_parts(chunk, child_default.clone(), depth + 1, out)?;
    }
    Ok(())
}

/// Splits a multipart body on its boundary. The preamble and epilogue are
/// discarded. A missing close delimiter ends the last part at end of input.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut chunks = Vec::new();
    let mut current: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i);
        let next = (line_end + 1).min(body.len());
        let line = body[pos..line_end].strip_suffix(b"\r").unwrap_or(&body[pos..line_end]);

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let rest = rest.trim_ascii_end();
            let closing = rest == b"--";
            if closing || rest.is_empty() {
                if let Some(start) = current {
                    chunks.push(strip_line_break(&body[start..pos]));
                }
                if closing {
                    return chunks;
                }
                current = Some(next);
            }
        }
        pos = next;
    }

    if let Some(start) = current {
        chunks.push(&body[start.min(body.len())..]);
    }
    chunks
}

/// The line break before a delimiter belongs to the delimiter.
fn strip_line_break(chunk: &[u8]) -> &[u8] {
    chunk
        .strip_suffix(b"\r\n")
        .or_else(|| chunk.strip_suffix(b"\n"))
        .unwrap_or(chunk)
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

    const MIXED: &[u8] = b"From: travel@example.com\r\n\
Subject: =?UTF-8?Q?Your_flight_to_Z=C3=BCrich?=\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
preamble\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Your flight is confirmed. Gr=C3=BC=\r\nezi\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: application/pdf; name=\"ticket.pdf\"\r\n\
Content-Disposition: attachment\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0x\r\n\
--outer\r\n\
Content-Type: text/plain; charset=iso-8859-1\r\n\
Content-Disposition: attachment; filename=notes.txt\r\n\
\r\n\
caf\xe9\r\n\
--outer--\r\n\
epilogue\r\n";

    #[test]
    fn walks_nested_multiparts_in_order() {
        let message = Message::parse(MIXED).unwrap();
        let types: Vec<_> = message.parts().iter().map(Part::media_type).collect();
        assert_eq!(
            types,
            vec!["text/plain", "text/html", "application/pdf", "text/plain"]
        );
    }

    #[test]
    fn subject_is_decoded() {
        let message = Message::parse(MIXED).unwrap();
        assert_eq!(message.subject().as_deref(), Some("Your flight to Zürich"));
    }

    #[test]
    fn plain_text_concatenates_all_text_plain_parts() {
        let message = Message::parse(MIXED).unwrap();
        assert_eq!(
            message.plain_text().unwrap(),
            "Your flight is confirmed. Grüezicafé"
        );
    }

    #[test]
    fn attachments_use_disposition_then_name() {
        let message = Message::parse(MIXED).unwrap();
        let names: Vec<_> = message.attachments().filter_map(Part::filename).collect();
        assert_eq!(names, vec!["ticket.pdf", "notes.txt"]);

        let pdf = message.attachments().next().unwrap();
        assert_eq!(pdf.decoded_body().unwrap(), b"%PDF-1");
    }

    #[test]
    fn single_part_message() {
        let message = Message::parse(b"Subject: hi\r\n\r\nhello world").unwrap();
        assert_eq!(message.parts().len(), 1);
        assert_eq!(message.plain_text().unwrap(), "hello world");
        assert_eq!(message.attachments().count(), 0);
    }

    #[test]
    fn missing_subject() {
        let message = Message::parse(b"From: a\r\n\r\nbody").unwrap();
        assert_eq!(message.subject(), None);
    }

    #[test]
    fn non_text_single_part_has_no_body_text() {
        let raw = b"Content-Type: image/png\r\n\r\n\x89PNG";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.plain_text().unwrap(), "");
    }

    #[test]
    fn invalid_content_type_defaults_to_text_plain() {
        let message = Message::parse(b"Content-Type: garbage\r\n\r\nstill text").unwrap();
        assert_eq!(message.parts()[0].media_type(), "text/plain");
        assert_eq!(message.plain_text().unwrap(), "still text");
    }

    #[test]
    fn multipart_without_boundary_is_leaf() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\n--x\r\nbody\r\n--x--\r\n";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts().len(), 1);
        assert_eq!(message.parts()[0].media_type(), "multipart/mixed");
    }

    #[test]
    fn unterminated_multipart_keeps_last_part() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nfirst\r\n--b\r\n\r\nsecond";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.plain_text().unwrap(), "firstsecond");
    }

    #[test]
    fn malformed_charset_is_error() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\r\ncaf\xe9";
        let message = Message::parse(raw).unwrap();
        assert!(matches!(message.plain_text(), Err(Error::MalformedText { .. })));
    }

    #[test]
    fn bad_base64_body_is_error() {
        let raw = b"Content-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!!";
        let message = Message::parse(raw).unwrap();
        assert!(matches!(message.plain_text(), Err(Error::Base64Decode(_))));
    }

    #[test]
    fn disposition_without_filename_is_not_attachment() {
        let raw = b"Content-Type: text/plain\r\nContent-Disposition: inline\r\n\r\nx";
        let message = Message::parse(raw).unwrap();
        assert!(message.parts()[0].has_disposition());
        assert_eq!(message.attachments().count(), 0);
    }

    #[test]
    fn name_without_disposition_is_not_attachment() {
        let raw = b"Content-Type: image/png; name=logo.png\r\n\r\nx";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts()[0].filename().as_deref(), Some("logo.png"));
        assert_eq!(message.attachments().count(), 0);
    }

    #[test]
    fn encoded_word_filename() {
        let raw = b"Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"=?UTF-8?Q?r=C3=A9sum=C3=A9.pdf?=\"\r\n\r\nx";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts()[0].filename().as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn digest_children_default_to_message() {
        let raw = b"Content-Type: multipart/digest; boundary=d\r\n\r\n--d\r\n\r\nSubject: inner\r\n\r\nx\r\n--d--";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts()[0].media_type(), "message/rfc822");
    }

    #[test]
    fn nesting_limit() {
        let mut raw = Vec::new();
        for i in 0..=MAX_DEPTH {
            raw.extend_from_slice(
                format!("Content-Type: multipart/mixed; boundary=b{i}\r\n\r\n--b{i}\r\n").as_bytes(),
            );
        }
        raw.extend_from_slice(b"\r\nleaf");
        assert!(matches!(Message::parse(&raw), Err(Error::TooDeep(_))));
    }

    #[test]
    fn boundary_prefix_lines_are_content() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\n--bogus line\r\n--b--";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.plain_text().unwrap(), "--bogus line");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_never_panics(input in proptest::collection::vec(any::<u8>(), 0..512)) {
            if let Ok(message) = Message::parse(&input) {
                prop_assert!(!message.parts().is_empty());
                let _ = message.plain_text();
                let _ = message.attachments().count();
            }
        }

        #[test]
        fn bodies_split_back_out(bodies in proptest::collection::vec("[a-z ]{0,40}", 1..6)) {
            let mut raw = b"Content-Type: multipart/mixed; boundary=zz\r\n\r\n".to_vec();
            for body in &bodies {
                raw.extend_from_slice(format!("--zz\r\n\r\n{body}\r\n").as_bytes());
            }
            raw.extend_from_slice(b"--zz--\r\n");

            let message = Message::parse(&raw).unwrap();
            prop_assert_eq!(message.parts().len(), bodies.len());
            prop_assert_eq!(message.plain_text().unwrap(), bodies.concat());
        }
    }
}
