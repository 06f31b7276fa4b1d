//! Credential acquisition.
//!
//! [`SessionProvider::acquire`] turns whatever is on disk into a usable
//! token: reuse it if still valid, refresh it if it can be refreshed, and
//! otherwise ask the user through the browser. Any new token is persisted
//! before it is handed out.

mod authorizer;
mod store;

pub use authorizer::{Authorizer, GoogleAuthorizer};
pub use store::{CredentialStore, FileCredentialStore, StoreError};

use mailsort_oauth::Token;
use tracing::{debug, info, warn};

/// Errors that prevent obtaining a credential.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential store could not be read or written.
    #[error("Credential storage failed: {0}")]
    Storage(#[from] StoreError),

    /// The interactive authorization flow failed.
    #[error("Authorization failed: {0}")]
    Interactive(#[source] mailsort_oauth::Error),

    /// The identity provider cannot be contacted with the current settings.
    #[error("Authorization is not configured: {0}")]
    Config(String),
}

/// Produces a valid token from a store and an authorizer.
#[derive(Debug)]
pub struct SessionProvider<C, A> {
    store: C,
    authorizer: A,
}

impl<C, A> SessionProvider<C, A>
where
    C: CredentialStore,
    A: Authorizer,
{
    /// Creates a provider.
    pub const fn new(store: C, authorizer: A) -> Self {
        Self { store, authorizer }
    }

    /// Returns a token that is valid right now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the stored token cannot be read or
    /// the new one cannot be saved, [`AuthError::Config`] if the provider is
    /// not configured, and [`AuthError::Interactive`] if the user flow fails.
    pub async fn acquire(&self) -> Result<Token, AuthError> {
        let stored = self.store.load()?;

        if let Some(token) = stored {
            if token.is_valid() {
                debug!("Stored credential is still valid");
                return Ok(token);
            }

            if token.can_refresh() {
                match self.authorizer.refresh(&token).await {
                    Ok(refreshed) => {
                        info!("Access token refreshed");
                        self.store.save(&refreshed)?;
                        return Ok(refreshed);
                    }
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed; falling back to interactive authorization");
                    }
                }
            } else {
                debug!("Stored credential expired and cannot be refreshed");
            }
        }

        let token = self.authorizer.authorize().await.map_err(|e| match e {
            mailsort_oauth::Error::InvalidConfig(msg) => AuthError::Config(msg),
            other => AuthError::Interactive(other),
        })?;
        info!("Authorization complete");
        self.store.save(&token)?;
        Ok(token)
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
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        token: Mutex<Option<Token>>,
        saves: AtomicUsize,
        fail_load: bool,
    }

    impl MemoryStore {
        fn with(token: Token) -> Self {
            Self {
                token: Mutex::new(Some(token)),
                ..Self::default()
            }
        }

        fn stored(&self) -> Option<Token> {
            self.token.lock().unwrap().clone()
        }
    }

    impl CredentialStore for MemoryStore {
        fn load(&self) -> Result<Option<Token>, StoreError> {
            if self.fail_load {
                return Err(StoreError::Io {
                    path: "token.json".into(),
                    source: std::io::Error::other("denied"),
                });
            }
            Ok(self.stored())
        }

        fn save(&self, token: &Token) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.token.lock().unwrap() = Some(token.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAuthorizer {
        refresh_fails: bool,
        authorize_error: Option<fn() -> mailsort_oauth::Error>,
        refreshes: AtomicUsize,
        authorizations: AtomicUsize,
    }

    #[async_trait]
    impl Authorizer for FakeAuthorizer {
        async fn refresh(&self, token: &Token) -> mailsort_oauth::Result<Token> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.refresh_fails {
                return Err(mailsort_oauth::Error::oauth_error("invalid_grant", "revoked"));
            }
            Ok(Token::new("refreshed", "Bearer")
                .with_refresh_token(token.refresh_token.clone().unwrap_or_default())
                .with_expires_at(Utc::now() + Duration::hours(1)))
        }

        async fn authorize(&self) -> mailsort_oauth::Result<Token> {
            self.authorizations.fetch_add(1, Ordering::SeqCst);
            if let Some(make_error) = self.authorize_error {
                return Err(make_error());
            }
            Ok(Token::new("interactive", "Bearer").with_refresh_token("new-refresh"))
        }
    }

    fn expired(refresh: Option<&str>) -> Token {
        let token =
            Token::new("old", "Bearer").with_expires_at(Utc::now() - Duration::minutes(5));
        match refresh {
            Some(r) => token.with_refresh_token(r),
            None => token,
        }
    }

    #[tokio::test]
    async fn valid_token_used_unchanged() {
        let token = Token::new("fresh", "Bearer").with_expires_at(Utc::now() + Duration::hours(1));
        let provider = SessionProvider::new(MemoryStore::with(token.clone()), FakeAuthorizer::default());

        assert_eq!(provider.acquire().await.unwrap(), token);
        assert_eq!(provider.store.saves.load(Ordering::SeqCst), 0);
        assert_eq!(provider.authorizer.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_refreshed_and_persisted() {
        let provider = SessionProvider::new(
            MemoryStore::with(expired(Some("keep-me"))),
            FakeAuthorizer::default(),
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "refreshed");
        assert_eq!(token.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(provider.store.stored(), Some(token));
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_failure_falls_back_to_interactive() {
        let provider = SessionProvider::new(
            MemoryStore::with(expired(Some("revoked"))),
            FakeAuthorizer {
                refresh_fails: true,
                ..FakeAuthorizer::default()
            },
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "interactive");
        assert_eq!(provider.authorizer.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(provider.store.stored(), Some(token));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_goes_interactive() {
        let provider =
            SessionProvider::new(MemoryStore::with(expired(None)), FakeAuthorizer::default());

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "interactive");
        assert_eq!(provider.authorizer.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn absent_token_goes_interactive_and_persists() {
        let provider = SessionProvider::new(MemoryStore::default(), FakeAuthorizer::default());

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "interactive");
        assert_eq!(provider.store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn interactive_failure_is_reported() {
        let provider = SessionProvider::new(
            MemoryStore::default(),
            FakeAuthorizer {
                authorize_error: Some(|| mailsort_oauth::Error::AccessDenied),
                ..FakeAuthorizer::default()
            },
        );

        let err = provider.acquire().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Interactive(mailsort_oauth::Error::AccessDenied)
        ));
        assert!(provider.store.stored().is_none());
    }

    #[tokio::test]
    async fn missing_client_configuration() {
        let provider = SessionProvider::new(
            MemoryStore::default(),
            FakeAuthorizer {
                authorize_error: Some(|| mailsort_oauth::Error::InvalidConfig("no secrets".into())),
                ..FakeAuthorizer::default()
            },
        );

        assert!(matches!(
            provider.acquire().await.unwrap_err(),
            AuthError::Config(_)
        ));
    }

    #[tokio::test]
    async fn unreadable_store_is_storage_error() {
        let provider = SessionProvider::new(
            MemoryStore {
                fail_load: true,
                ..MemoryStore::default()
            },
            FakeAuthorizer::default(),
        );

        assert!(matches!(
            provider.acquire().await.unwrap_err(),
            AuthError::Storage(_)
        ));
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 0);
    }
}
