//! Identity provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Read-only Gmail scope requested by default.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Full mailbox scope, needed by servers that refuse IMAP under narrower grants.
pub const GMAIL_FULL_SCOPE: &str = "https://mail.google.com/";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Scopes requested when the caller does not name any.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Google with the read-only Gmail scope.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Ok(Self::new("Google", GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)?
            .with_default_scopes(vec![GMAIL_READONLY_SCOPE.to_string()]))
    }

    /// Returns true if the endpoints point at Google.
    #[must_use]
    pub fn is_google(&self) -> bool {
        self.auth_url
            .host_str()
            .is_some_and(|host| host == "accounts.google.com")
    }

    /// Validates that the endpoints are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not HTTPS.
    pub fn validate(&self) -> Result<()> {
        for (what, url) in [("auth_url", &self.auth_url), ("token_url", &self.token_url)] {
            if url.scheme() != "https" {
                return Err(Error::InvalidConfig(format!("{what} must use https: {url}")));
            }
        }
        Ok(())
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

    #[test]
    fn test_google_provider() {
        let provider = Provider::google().unwrap();
        assert_eq!(provider.name, "Google");
        assert_eq!(provider.default_scopes, [GMAIL_READONLY_SCOPE]);
        assert!(provider.is_google());
        provider.validate().unwrap();
    }

    #[test]
    fn test_plain_http_rejected() {
        let provider = Provider::new(
            "Custom",
            "http://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();

        assert!(!provider.is_google());
        assert!(matches!(provider.validate(), Err(Error::InvalidConfig(_))));
    }
}
