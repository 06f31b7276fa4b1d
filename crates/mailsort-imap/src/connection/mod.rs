//! IMAP connection management.
//!
//! - Configuration (host, port, timeouts)
//! - TLS transport
//! - Framed I/O with literal handling
//! - Type-state client

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Selected};
pub use config::{Config, IMAPS_PORT};
pub use framed::{FramedStream, MAX_LITERAL_SIZE};
pub use stream::{ImapStream, connect_tls, create_tls_connector};
