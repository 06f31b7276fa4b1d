//! # mailsort-core
//!
//! Sorts a mailbox into categories by the nouns its messages use.
//!
//! A run acquires a credential ([`session`]), opens the mail store
//! ([`source`]), and hands each message to the [`Pipeline`]: decode it
//! ([`message`]), tag its plain-text body ([`tagger`]), match common nouns
//! against the configured [`CategorySet`] ([`classify`]), then label the
//! message and save its attachments under one directory per category
//! ([`export`]).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod category;
pub mod classify;
pub mod config;
mod error;
pub mod export;
pub mod message;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod tagger;

pub use category::{Category, CategorySet};
pub use classify::classify;
pub use config::{Config, ConfigError, LabelMode, SaslMode};
pub use error::{Error, Result};
pub use export::{Exporter, SaveOutcome};
pub use message::{DecodeError, Message, MessageId, Part};
pub use pipeline::{Pipeline, RunReport};
pub use session::{
    AuthError, Authorizer, CredentialStore, FileCredentialStore, GoogleAuthorizer,
    SessionProvider, StoreError,
};
pub use source::{ImapSource, MessageSource, SourceError};
pub use tagger::{LexiconTagger, PosTag, Tagger};
