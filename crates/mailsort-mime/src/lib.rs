//! # mailsort-mime
//!
//! MIME message parsing for fetched mail.
//!
//! ## Features
//!
//! - **Part tree**: depth-first walk of nested multiparts into leaf parts
//! - **Transfer decoding**: Base64 (lenient) and Quoted-Printable
//! - **Charsets**: strict body decoding in the declared charset via `encoding_rs`
//! - **Headers**: RFC 2047 encoded-words, RFC 2231 parameter continuations
//! - **Attachments**: filename from Content-Disposition or the Content-Type `name`
//!
//! ## Quick Start
//!
//! ```
//! use mailsort_mime::Message;
//!
//! let raw = b"Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n\
//!             Content-Type: multipart/mixed; boundary=b\r\n\
//!             \r\n\
//!             --b\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Table for two\r\n\
//!             --b\r\n\
//!             Content-Type: text/csv\r\n\
//!             Content-Disposition: attachment; filename=menu.csv\r\n\
//!             \r\n\
//!             dish,price\r\n\
//!             --b--\r\n";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Café"));
//! assert_eq!(message.plain_text()?, "Table for two");
//!
//! let attachment = message.attachments().next().unwrap();
//! assert_eq!(attachment.filename().as_deref(), Some("menu.csv"));
//! assert_eq!(attachment.decoded_body()?, b"dish,price");
//! # Ok::<(), mailsort_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod charset;
pub mod encoding;

pub use content_type::{ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{MAX_DEPTH, Message, Part, TransferEncoding};
