//! # mailsort-imap
//!
//! The slice of IMAP (RFC 3501 / RFC 9051) that mailsort needs to read a
//! mailbox and label messages, with Gmail's `X-GM-LABELS` extension.
//!
//! - Implicit TLS via rustls
//! - AUTHENTICATE with XOAUTH2 or OAUTHBEARER
//! - SELECT, `SEARCH ALL`, `FETCH BODY.PEEK[]`, STORE
//! - Sans-I/O response parser
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ── authenticate() ──→ Authenticated ── select() ──→ Selected
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use mailsort_imap::{Client, Config, SaslMechanism, connect_tls};
//!
//! let stream = connect_tls(&Config::gmail()).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.authenticate(SaslMechanism::XOAuth2, "me@gmail.com", &token).await?;
//! let (mut inbox, status) = client.select("INBOX").await?;
//! for seq in inbox.search_all().await? {
//!     let raw = inbox.fetch_raw(seq).await?;
//! }
//! inbox.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SaslMechanism, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FramedStream, ImapStream, NotAuthenticated, Selected,
    connect_tls,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, Mailbox, MailboxStatus, ResponseCode, SeqNum, Status, Tag,
};
