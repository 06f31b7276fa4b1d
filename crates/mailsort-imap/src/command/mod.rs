//! IMAP command builder.
//!
//! Only the commands the mail source issues are modelled; each serializes to
//! a complete CRLF-terminated line.

mod serialize;
mod tag_generator;

use crate::types::{Flag, Mailbox, SeqNum};

pub use tag_generator::TagGenerator;

use serialize::{write_fetch_attributes, write_mailbox, write_store_action};

/// SASL mechanism used with AUTHENTICATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaslMechanism {
    /// Google's XOAUTH2.
    #[default]
    XOAuth2,
    /// RFC 7628 OAUTHBEARER.
    OAuthBearer,
}

impl SaslMechanism {
    /// Mechanism name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::XOAuth2 => "XOAUTH2",
            Self::OAuthBearer => "OAUTHBEARER",
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// FLAGS.
    Flags,
    /// UID.
    Uid,
    /// RFC822.SIZE.
    Rfc822Size,
    /// X-GM-LABELS (Gmail extension).
    GmailLabels,
    /// BODY\[section\] or BODY.PEEK\[section\]; `None` is the whole message.
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Do not set `\Seen`.
        peek: bool,
    },
}

impl FetchAttribute {
    /// The complete raw message, leaving `\Seen` untouched.
    #[must_use]
    pub const fn full_message_peek() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }
}

/// STORE modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS (...)`.
    AddFlags(Vec<Flag>),
    /// `+X-GM-LABELS (...)` (Gmail extension).
    AddGmailLabels(Vec<String>),
}

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// LOGOUT command.
    Logout,
    /// AUTHENTICATE command.
    Authenticate {
        /// Authentication mechanism.
        mechanism: SaslMechanism,
        /// Base64 initial response sent with the command (SASL-IR).
        initial_response: Option<String>,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// `SEARCH ALL`.
    SearchAll,
    /// FETCH command for one message.
    Fetch {
        /// Message to fetch.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchAttribute>,
    },
    /// STORE command for one message.
    Store {
        /// Message to modify.
        seq: SeqNum,
        /// Modification.
        action: StoreAction,
    },
}

impl Command {
    /// Serializes the command with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
                if let Some(response) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(response.as_bytes());
                }
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox);
            }
            Self::SearchAll => buf.extend_from_slice(b"SEARCH ALL"),
            Self::Fetch { seq, items } => {
                buf.extend_from_slice(format!("FETCH {seq} ").as_bytes());
                write_fetch_attributes(&mut buf, items);
            }
            Self::Store { seq, action } => {
                buf.extend_from_slice(format!("STORE {seq} ").as_bytes());
                write_store_action(&mut buf, action);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Command name for logs; never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::Select { .. } => "SELECT",
            Self::SearchAll => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
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

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001")).unwrap()
    }

    fn seq(n: u32) -> SeqNum {
        SeqNum::new(n).unwrap()
    }

    #[test]
    fn authenticate_with_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: SaslMechanism::XOAuth2,
            initial_response: Some("dXNlcj1h".into()),
        };
        assert_eq!(wire(&cmd), "A0001 AUTHENTICATE XOAUTH2 dXNlcj1h\r\n");
        assert_eq!(cmd.name(), "AUTHENTICATE");
    }

    #[test]
    fn authenticate_without_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: SaslMechanism::OAuthBearer,
            initial_response: None,
        };
        assert_eq!(wire(&cmd), "A0001 AUTHENTICATE OAUTHBEARER\r\n");
    }

    #[test]
    fn select_quotes_when_needed() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(wire(&cmd), "A0001 SELECT INBOX\r\n");

        let cmd = Command::Select {
            mailbox: Mailbox::new("[Gmail]/All Mail"),
        };
        assert_eq!(wire(&cmd), "A0001 SELECT \"[Gmail]/All Mail\"\r\n");
    }

    #[test]
    fn search_all() {
        assert_eq!(wire(&Command::SearchAll), "A0001 SEARCH ALL\r\n");
    }

    #[test]
    fn fetch_whole_message_without_marking_seen() {
        let cmd = Command::Fetch {
            seq: seq(7),
            items: vec![FetchAttribute::full_message_peek()],
        };
        assert_eq!(wire(&cmd), "A0001 FETCH 7 BODY.PEEK[]\r\n");

        let cmd = Command::Fetch {
            seq: seq(7),
            items: vec![FetchAttribute::Uid, FetchAttribute::Flags],
        };
        assert_eq!(wire(&cmd), "A0001 FETCH 7 (UID FLAGS)\r\n");
    }

    #[test]
    fn store_gmail_label() {
        let cmd = Command::Store {
            seq: seq(3),
            action: StoreAction::AddGmailLabels(vec!["travel".into()]),
        };
        assert_eq!(wire(&cmd), "A0001 STORE 3 +X-GM-LABELS (travel)\r\n");

        let cmd = Command::Store {
            seq: seq(3),
            action: StoreAction::AddGmailLabels(vec!["Work Trips".into()]),
        };
        assert_eq!(wire(&cmd), "A0001 STORE 3 +X-GM-LABELS (\"Work Trips\")\r\n");
    }

    #[test]
    fn store_keyword() {
        let cmd = Command::Store {
            seq: seq(12),
            action: StoreAction::AddFlags(vec![Flag::Keyword("personal".into())]),
        };
        assert_eq!(wire(&cmd), "A0001 STORE 12 +FLAGS (personal)\r\n");
    }

    #[test]
    fn logout() {
        assert_eq!(wire(&Command::Logout), "A0001 LOGOUT\r\n");
        assert_eq!(SaslMechanism::default(), SaslMechanism::XOAuth2);
    }
}
