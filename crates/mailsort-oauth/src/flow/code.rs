//! Authorization Code Flow implementation.

use super::{LoopbackListener, OAuthClient, PkceChallenge};
use crate::error::Result;
use crate::token::Token;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Authorization Code Flow for `OAuth2`.
///
/// Suitable for applications that can open a browser and receive the
/// authorization code via a redirect to the local machine.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: Option<PkceChallenge>,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client, pkce: None }
    }

    /// Enables PKCE.
    #[must_use]
    pub fn with_pkce(mut self) -> Self {
        self.pkce = Some(PkceChallenge::generate());
        self
    }

    /// Builds the authorization URL for user consent.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Scopes to request (provider defaults if `None`)
    /// * `state` - Opaque value echoed back by the redirect
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self, scopes: Option<&[String]>, state: Option<&str>) -> Result<Url> {
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code");

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            let scope_str = scopes.map_or_else(
                || self.client.provider.default_scopes.join(" "),
                |s| s.join(" "),
            );
            if !scope_str.is_empty() {
                pairs.append_pair("scope", &scope_str);
            }

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }

            if let Some(pkce) = &self.pkce {
                pairs
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce.method());
            }

            // A refresh token is only issued for offline access with fresh consent
            if self.client.provider.is_google() {
                pairs
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<Token> {
        let code_verifier = self.pkce.as_ref().map(PkceChallenge::verifier);
        self.client
            .exchange_code(code, redirect_uri, code_verifier)
            .await
    }

    /// Returns the PKCE verifier if PKCE is enabled.
    #[must_use]
    pub fn pkce_verifier(&self) -> Option<&str> {
        self.pkce.as_ref().map(PkceChallenge::verifier)
    }

    /// Runs the whole interactive flow against a loopback redirect.
    ///
    /// Binds [`LoopbackListener`] on an ephemeral port, opens the consent page
    /// in the default browser (the URL is also logged for headless machines),
    /// waits up to `timeout` for the redirect and exchanges the code.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound, the user denies
    /// consent, the redirect does not arrive in time, its state does not
    /// match, or the code exchange fails.
    pub async fn run_local_server(mut self, timeout: Duration) -> Result<Token> {
        let listener = LoopbackListener::bind().await?;
        let redirect_uri = listener.redirect_uri();
        self.client.redirect_uri = Some(redirect_uri.clone());

        let state = random_state();
        let url = self.authorization_url(None, Some(&state))?;

        info!("Open this URL to authorize mailsort: {url}");
        if let Err(e) = opener::open(url.as_str()) {
            warn!(error = %e, "could not open a browser; visit the URL manually");
        }

        let code = listener.wait_for_code(&state, timeout).await?;
        self.exchange_code(&code, Some(&redirect_uri)).await
    }
}

fn random_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    #[test]
    fn test_authorization_url() {
        let provider = Provider::google().unwrap();
        let client =
            OAuthClient::new("test_client", provider).with_redirect_uri("http://127.0.0.1:8080/");

        let flow = AuthorizationCodeFlow::new(client);
        let url = flow.authorization_url(None, Some("random_state")).unwrap();

        assert!(url.as_str().contains("client_id=test_client"));
        assert!(url.as_str().contains("response_type=code"));
        assert!(url.as_str().contains("state=random_state"));
        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2F")
        );
        assert!(url.as_str().contains("access_type=offline"));
        assert!(url.as_str().contains("prompt=consent"));
    }

    #[test]
    fn test_default_scope_is_readonly() {
        let client = OAuthClient::new("test_client", Provider::google().unwrap());
        let url = AuthorizationCodeFlow::new(client)
            .authorization_url(None, None)
            .unwrap();

        let scope = url
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(scope, "https://www.googleapis.com/auth/gmail.readonly");
    }

    #[test]
    fn test_authorization_url_with_pkce() {
        let client = OAuthClient::new("test_client", Provider::google().unwrap());

        let flow = AuthorizationCodeFlow::new(client).with_pkce();
        let url = flow.authorization_url(None, None).unwrap();

        assert!(url.as_str().contains("code_challenge="));
        assert!(url.as_str().contains("code_challenge_method=S256"));
        assert!(flow.pkce_verifier().is_some());
    }

    #[test]
    fn test_random_state_is_unique() {
        let a = random_state();
        let b = random_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
