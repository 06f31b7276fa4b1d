//! SASL initial responses for bearer-token authentication.
//!
//! Implements:
//! - XOAUTH2 (Google proprietary, what Gmail documents for IMAP)
//! - OAUTHBEARER (RFC 7628)

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Generates the XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01` (base64 encoded)
///
/// # Example
///
/// ```
/// use mailsort_oauth::sasl::xoauth2_response;
///
/// let response = xoauth2_response("user@example.com", "ya29.a0...");
/// assert!(!response.contains("ya29"));
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates the OAUTHBEARER initial response.
///
/// Format: `n,a=<user>,\x01auth=Bearer <token>\x01\x01` (base64 encoded)
#[must_use]
pub fn oauthbearer_response(user: &str, token: &str) -> String {
    let auth_string = format!("n,a={user},\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Decodes the base64 error challenge a server sends after a rejected token.
///
/// Returns `None` if the payload is not base64-encoded JSON of the expected shape.
#[must_use]
pub fn parse_oauth_error(challenge: &str) -> Option<OAuthError> {
    let raw = STANDARD.decode(challenge.trim()).ok()?;
    serde_json::from_slice(&raw).ok()
}

/// Error details carried in a SASL error challenge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    /// HTTP-style status (e.g., "401", "400").
    pub status: String,
    /// Authentication schemes supported.
    #[serde(default)]
    pub schemes: Option<String>,
    /// Scope the server requires.
    #[serde(default)]
    pub scope: Option<String>,
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

    fn decode(response: &str) -> String {
        String::from_utf8(STANDARD.decode(response).unwrap()).unwrap()
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        assert_eq!(decode(&response), "user=test@test.com\x01auth=Bearer abc\x01\x01");
    }

    #[test]
    fn test_oauthbearer_format() {
        let response = oauthbearer_response("test@test.com", "abc");
        assert_eq!(
            decode(&response),
            "n,a=test@test.com,\x01auth=Bearer abc\x01\x01"
        );
    }

    #[test]
    fn test_token_not_visible_in_clear() {
        let response = xoauth2_response("user@example.com", "token");
        assert!(!response.contains("user@example.com"));
        assert!(!response.contains("token"));
    }

    #[test]
    fn test_parse_error_challenge() {
        let json = r#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        let challenge = STANDARD.encode(json);

        let error = parse_oauth_error(&challenge).unwrap();
        assert_eq!(error.status, "401");
        assert_eq!(error.schemes.as_deref(), Some("bearer"));
        assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
    }

    #[test]
    fn test_parse_error_garbage() {
        assert!(parse_oauth_error("not base64!").is_none());
        assert!(parse_oauth_error(&STANDARD.encode("plain text")).is_none());
    }
}
