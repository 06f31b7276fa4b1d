//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// The declared charset is not one we can decode.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// The text is not valid in its declared charset.
    #[error("Text is not valid {charset}")]
    MalformedText {
        /// Charset the bytes were decoded with.
        charset: String,
    },

    /// Multipart nesting exceeds the supported depth.
    #[error("Multipart nesting deeper than {0} levels")]
    TooDeep(usize),
}
