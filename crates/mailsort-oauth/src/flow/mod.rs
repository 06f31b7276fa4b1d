//! `OAuth2` authorization flows.

mod code;
mod loopback;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use loopback::{AuthorizationResponse, LoopbackListener};
pub use pkce::PkceChallenge;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::secrets::ClientSecrets;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// Registered `OAuth2` client plus the provider it talks to.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (installed apps still receive one from Google).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Creates a client from a downloaded client-secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints in the file are not valid URLs.
    pub fn from_secrets(secrets: &ClientSecrets) -> Result<Self> {
        let mut client = Self::new(secrets.client_id.clone(), secrets.provider()?);
        client.client_secret = secrets
            .client_secret
            .clone()
            .filter(|secret| !secret.is_empty());
        Ok(client)
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Replaces the provider's default scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.provider.default_scopes = scopes;
        self
    }

    /// Refreshes an access token using its refresh token.
    ///
    /// The returned token keeps the old refresh token when the provider does
    /// not issue a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        debug!(provider = %self.provider.name, "refreshing access token");
        let mut new_token = self.post_token_request(&params).await?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }

        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<Token> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &self.client_id);

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.insert("redirect_uri", uri);
        }

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        if let Some(verifier) = code_verifier {
            params.insert("code_verifier", verifier);
        }

        debug!(provider = %self.provider.name, "exchanging authorization code");
        self.post_token_request(&params).await
    }

    async fn post_token_request(&self, params: &HashMap<&str, &str>) -> Result<Token> {
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::oauth_error(status.as_str(), body.trim()),
                ErrorResponse::into_error,
            ));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)?;
        Token::from_response(token_response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_secrets() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed":{"client_id":"abc.apps.googleusercontent.com","client_secret":"shh"}}"#,
        )
        .unwrap();

        let client = OAuthClient::from_secrets(&secrets).unwrap();
        assert_eq!(client.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(client.client_secret.as_deref(), Some("shh"));
        assert_eq!(client.provider.name, "Google");
        assert!(client.redirect_uri.is_none());
    }

    #[test]
    fn test_empty_secret_is_dropped() {
        let secrets =
            ClientSecrets::from_json(r#"{"installed":{"client_id":"abc","client_secret":""}}"#)
                .unwrap();
        let client = OAuthClient::from_secrets(&secrets).unwrap();
        assert!(client.client_secret.is_none());
    }

    #[test]
    fn test_scope_override() {
        let client = OAuthClient::new("id", Provider::google().unwrap())
            .with_scopes(vec!["https://mail.google.com/".to_string()]);
        assert_eq!(client.provider.default_scopes, ["https://mail.google.com/"]);
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let client = OAuthClient::new("id", Provider::google().unwrap());
        let token = Token::new("expired", "Bearer");
        assert!(matches!(
            client.refresh_token(&token).await,
            Err(Error::NoRefreshToken)
        ));
    }
}
