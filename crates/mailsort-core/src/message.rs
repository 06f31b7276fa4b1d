//! Typed view of one fetched message.

use std::fmt;
use std::num::NonZeroU32;

use mailsort_imap::SeqNum;
use mailsort_mime::{Message as MimeMessage, TransferEncoding};

/// Error raised when a raw message cannot be turned into text and parts.
pub type DecodeError = mailsort_mime::Error;

/// Store-assigned message identifier (a sequence number, never zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(NonZeroU32);

impl MessageId {
    /// Creates an identifier. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SeqNum> for MessageId {
    fn from(seq: SeqNum) -> Self {
        Self(seq.0)
    }
}

impl From<MessageId> for SeqNum {
    fn from(id: MessageId) -> Self {
        Self(id.0)
    }
}

/// A leaf body part. The payload keeps its transfer encoding until
/// [`Part::payload`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// `type/subtype`, lowercased.
    pub media_type: String,
    /// Whether the part carried a Content-Disposition header.
    pub disposition_present: bool,
    /// Filename from the disposition, or the content type's `name`.
    pub filename: Option<String>,
    encoding: TransferEncoding,
    raw: Vec<u8>,
}

impl Part {
    /// Returns true if this part is saved when its message matches.
    #[must_use]
    pub const fn is_attachment(&self) -> bool {
        self.disposition_present && self.filename.is_some()
    }

    /// Payload with the transfer encoding removed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the encoded bytes are malformed.
    pub fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        self.encoding.decode(&self.raw)
    }
}

/// Parsed message ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identifier in the selected folder.
    pub id: MessageId,
    /// Decoded Subject, if any.
    pub subject: Option<String>,
    /// Every `text/plain` part concatenated in order.
    pub body: String,
    /// Every leaf part in order.
    pub parts: Vec<Part>,
}

impl Message {
    /// Parses raw RFC 5322 bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if a `text/plain` part cannot be decoded
    /// or the multipart nesting is too deep. Other parts are not decoded
    /// here.
    pub fn parse(id: MessageId, raw: &[u8]) -> Result<Self, DecodeError> {
        let mime = MimeMessage::parse(raw)?;

        let parts = mime
            .parts()
            .iter()
            .map(|part| Part {
                media_type: part.media_type(),
                disposition_present: part.has_disposition(),
                filename: part.filename(),
                encoding: part.transfer_encoding(),
                raw: part.raw_body().to_vec(),
            })
            .collect();

        Ok(Self {
            id,
            subject: mime.subject(),
            body: mime.plain_text()?,
            parts,
        })
    }

    /// Parts saved when the message matches a category.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_attachment())
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

    fn id(n: u32) -> MessageId {
        MessageId::new(n).unwrap()
    }

    #[test]
    fn message_id_rejects_zero() {
        assert!(MessageId::new(0).is_none());
        assert_eq!(id(7).get(), 7);
        assert_eq!(id(7).to_string(), "7");
    }

    #[test]
    fn seq_num_round_trip() {
        let seq = SeqNum::new(42).unwrap();
        let id = MessageId::from(seq);
        assert_eq!(SeqNum::from(id), seq);
    }

    #[test]
    fn parse_with_attachment() {
        let raw = b"Subject: =?ISO-8859-1?Q?R=E9servation?=\r\n\
Content-Type: multipart/mixed; boundary=sep\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
Hotel booked.\r\n\
--sep\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"itinerary.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC\r\n\
--sep--\r\n";

        let message = Message::parse(id(3), raw).unwrap();
        assert_eq!(message.id, id(3));
        assert_eq!(message.subject.as_deref(), Some("Réservation"));
        assert_eq!(message.body, "Hotel booked.");
        assert_eq!(message.parts.len(), 2);

        let attachments: Vec<_> = message.attachments().collect();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename.as_deref(), Some("itinerary.bin"));
        assert_eq!(attachments[0].payload().unwrap(), vec![0, 1, 2]);
        assert_eq!(attachments[0].media_type, "application/octet-stream");
    }

    #[test]
    fn no_text_plain_means_empty_body() {
        let raw = b"Content-Type: text/html\r\n\r\n<p>travel</p>";
        let message = Message::parse(id(1), raw).unwrap();
        assert_eq!(message.body, "");
        assert!(message.subject.is_none());
    }

    #[test]
    fn broken_attachment_encoding_is_deferred() {
        let raw = b"Content-Type: multipart/mixed; boundary=sep\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
Budget attached.\r\n\
--sep\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"budget.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
QUJD!\r\n\
--sep--\r\n";

        let message = Message::parse(id(5), raw).unwrap();
        assert_eq!(message.body, "Budget attached.");
        let attachment = message.attachments().next().unwrap();
        assert!(attachment.payload().is_err());
    }

    #[test]
    fn strict_charset_failure_is_decode_error() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\r\n\xff\xfe";
        assert!(matches!(
            Message::parse(id(1), raw),
            Err(DecodeError::MalformedText { .. })
        ));
    }
}
