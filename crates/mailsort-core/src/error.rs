//! Error types for the core library.

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::AuthError;
use crate::source::SourceError;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No usable credential could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The mail store session failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Local filesystem failure outside a single attachment.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
