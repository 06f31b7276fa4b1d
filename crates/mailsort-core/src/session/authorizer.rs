//! Token issuance through the identity provider.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use mailsort_oauth::{AuthorizationCodeFlow, ClientSecrets, OAuthClient, Token};
use tracing::{debug, info};

use crate::config::Config;

/// Issues and renews tokens.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Renews an expired token with its refresh token.
    async fn refresh(&self, token: &Token) -> mailsort_oauth::Result<Token>;

    /// Runs the interactive consent flow and returns a fresh token.
    async fn authorize(&self) -> mailsort_oauth::Result<Token>;
}

/// Google `OAuth2` through a downloaded client-secrets file.
#[derive(Debug, Clone)]
pub struct GoogleAuthorizer {
    secrets_path: Option<PathBuf>,
    scope: String,
    timeout: Duration,
}

impl GoogleAuthorizer {
    /// Creates an authorizer reading client credentials from `secrets_path`.
    #[must_use]
    pub fn new(secrets_path: impl Into<PathBuf>, scope: impl Into<String>) -> Self {
        Self {
            secrets_path: Some(secrets_path.into()),
            scope: scope.into(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Builds an authorizer from the run configuration.
    ///
    /// The secrets file is only required once the provider has to be
    /// contacted, so a missing path is not an error here.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            secrets_path: config.client_secrets_path.clone(),
            scope: config.oauth_scope.clone(),
            timeout: config.auth_timeout(),
        }
    }

    /// Sets how long to wait for the browser redirect.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client(&self) -> mailsort_oauth::Result<OAuthClient> {
        let path = self.secrets_path.as_ref().ok_or_else(|| {
            mailsort_oauth::Error::InvalidConfig(
                "no client secrets file configured (set CREDENTIALS_PATH)".into(),
            )
        })?;
        debug!(path = %path.display(), "Loading client secrets");
        let secrets = ClientSecrets::load(path)?;
        Ok(OAuthClient::from_secrets(&secrets)?.with_scopes(vec![self.scope.clone()]))
    }
}

#[async_trait]
impl Authorizer for GoogleAuthorizer {
    async fn refresh(&self, token: &Token) -> mailsort_oauth::Result<Token> {
        let client = self.client()?;
        debug!("Refreshing access token");
        client.refresh_token(token).await
    }

    async fn authorize(&self) -> mailsort_oauth::Result<Token> {
        let client = self.client()?;
        info!(
            timeout_secs = self.timeout.as_secs(),
            "Starting interactive authorization"
        );
        AuthorizationCodeFlow::new(client)
            .with_pkce()
            .run_local_server(self.timeout)
            .await
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_secrets_path_is_config_error() {
        let authorizer = GoogleAuthorizer::from_config(&Config::default());
        let err = authorizer.authorize().await.unwrap_err();
        assert!(matches!(err, mailsort_oauth::Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn unreadable_secrets_file_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let authorizer = GoogleAuthorizer::new(dir.path().join("absent.json"), "scope");
        let token = Token::new("a", "Bearer").with_refresh_token("r");
        assert!(authorizer.refresh(&token).await.is_err());
    }

    #[test]
    fn from_config_copies_settings() {
        let config = Config {
            client_secrets_path: Some(PathBuf::from("/tmp/secrets.json")),
            oauth_scope: "https://mail.google.com/".into(),
            auth_timeout_secs: 42,
            ..Config::default()
        };
        let authorizer = GoogleAuthorizer::from_config(&config);
        assert_eq!(authorizer.scope, "https://mail.google.com/");
        assert_eq!(authorizer.timeout, Duration::from_secs(42));
        assert_eq!(
            authorizer.secrets_path.as_deref(),
            Some(std::path::Path::new("/tmp/secrets.json"))
        );
    }
}
