//! Access to the mail store.
//!
//! [`MessageSource`] is the seam between the pipeline and the server.
//! [`ImapSource`] implements it over `mailsort-imap`; tests substitute fakes.

mod imap;

pub use imap::ImapSource;

use async_trait::async_trait;
use mailsort_oauth::Token;

use crate::category::Category;
use crate::message::MessageId;

/// Errors reported by a [`MessageSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The transport, TLS handshake or greeting failed.
    #[error("Connection failed: {0}")]
    Connection(#[source] mailsort_imap::Error),

    /// The server refused the credential.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The folder could not be selected.
    #[error("Cannot open folder {name}: {reason}")]
    Folder {
        /// Folder name.
        name: String,
        /// Server or transport message.
        reason: String,
    },

    /// Listing the folder's messages failed.
    #[error("Search failed: {0}")]
    Search(#[source] mailsort_imap::Error),

    /// One message could not be fetched.
    #[error("Cannot fetch message {id}: {reason}")]
    Fetch {
        /// Message that failed.
        id: MessageId,
        /// What went wrong.
        reason: String,
    },

    /// A label could not be applied.
    #[error("Cannot label message {id} as {label}: {reason}")]
    Label {
        /// Message that failed.
        id: MessageId,
        /// Label that was being applied.
        label: String,
        /// What went wrong.
        reason: String,
    },

    /// The operation is not possible in the session's current state.
    #[error("Session not ready: {0}")]
    NotReady(&'static str),
}

/// One session with a mail store, used sequentially.
///
/// Calls are expected in the order `open`, `select_folder`, then any number
/// of `list_all_ids`/`fetch_raw`/`apply_label`, and finally `close`.
#[async_trait]
pub trait MessageSource: Send {
    /// Connects (if needed) and authenticates with `token`.
    async fn open(&mut self, token: &Token) -> Result<(), SourceError>;

    /// Selects the folder to work on.
    async fn select_folder(&mut self, name: &str) -> Result<(), SourceError>;

    /// Every message in the selected folder, in store order.
    async fn list_all_ids(&mut self) -> Result<Vec<MessageId>, SourceError>;

    /// Full raw message without marking it read.
    async fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>, SourceError>;

    /// Attaches `label` to a message.
    async fn apply_label(&mut self, id: MessageId, label: &Category) -> Result<(), SourceError>;

    /// Ends the session. Calling it again does nothing.
    async fn close(&mut self);
}
