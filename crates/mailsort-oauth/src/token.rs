//! Access credential issued by the identity provider.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a token is already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// `OAuth2` access token plus the metadata needed to renew it.
///
/// This is the value persisted between runs, so every field round-trips
/// through JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token presented to the mail store.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Absolute expiry, if the provider reported a lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for silent renewal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by the authorization server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// Creates a token without expiry or refresh metadata.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Builds a token from a token-endpoint response received at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an empty access token.
    pub fn from_response_at(response: TokenResponse, now: DateTime<Utc>) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|secs| now + Duration::seconds(i64::from(secs))),
            refresh_token: response.refresh_token,
            scope: response.scope,
        })
    }

    /// Builds a token from a token-endpoint response received just now.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an empty access token.
    pub fn from_response(response: TokenResponse) -> Result<Self> {
        Self::from_response_at(response, Utc::now())
    }

    /// Checks expiry against `now`, with a one minute safety margin.
    ///
    /// A token without an expiry never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    /// Checks if the token is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the token is usable right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Returns true if the token can be renewed without user interaction.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the refresh token if available.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::NoRefreshToken)
    }
}

/// Token endpoint success body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// Refresh token (only on the first exchange for most providers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token endpoint error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_expiry_margin() {
        let token = Token::new("a", "Bearer").with_expires_at(at(3600));

        assert!(!token.is_expired_at(at(0)));
        assert!(!token.is_expired_at(at(3539)));
        assert!(token.is_expired_at(at(3540)));
        assert!(token.is_expired_at(at(7200)));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let token = Token::new("a", "Bearer");
        assert!(!token.is_expired_at(at(i64::from(u32::MAX))));
        assert!(token.is_valid());
    }

    #[test]
    fn test_refresh_capability() {
        assert!(!Token::new("a", "Bearer").can_refresh());
        assert!(!Token::new("a", "Bearer").with_refresh_token("").can_refresh());
        assert!(Token::new("a", "Bearer").with_refresh_token("r").can_refresh());
        assert!(matches!(
            Token::new("a", "Bearer").refresh_token(),
            Err(Error::NoRefreshToken)
        ));
    }

    #[test]
    fn test_from_response_sets_expiry() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29.x","expires_in":3599,"refresh_token":"1//r","scope":"s"}"#,
        )
        .unwrap();

        let token = Token::from_response_at(response, at(0)).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_at, Some(at(3599)));
        assert_eq!(token.refresh_token.as_deref(), Some("1//r"));
    }

    #[test]
    fn test_from_response_rejects_empty_token() {
        let response = TokenResponse {
            access_token: String::new(),
            token_type: "Bearer".into(),
            expires_in: None,
            refresh_token: None,
            scope: None,
        };
        assert!(Token::from_response(response).is_err());
    }

    #[test]
    fn test_persisted_form_round_trips() {
        let token = Token::new("ya29.x", "Bearer")
            .with_expires_at(at(10))
            .with_refresh_token("1//r");

        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);

        // Absent optional fields stay absent
        let bare: Token =
            serde_json::from_str(r#"{"access_token":"t","token_type":"Bearer"}"#).unwrap();
        assert!(bare.expires_at.is_none());
        assert!(bare.refresh_token.is_none());
    }
}
