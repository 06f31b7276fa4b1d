//! # mailsort-oauth
//!
//! `OAuth2` credential handling for the mailsort pipeline.
//!
//! ## Features
//!
//! - **Token model**: access token, expiry and refresh token, serializable so
//!   it can be persisted between runs
//! - **Refresh**: silent renewal through the refresh-token grant
//! - **Interactive flow**: authorization code with PKCE, redirected to a
//!   loopback listener on an ephemeral port
//! - **Client secrets**: Google "installed app" JSON files
//! - **SASL**: XOAUTH2 and OAUTHBEARER initial responses for IMAP
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsort_oauth::{AuthorizationCodeFlow, ClientSecrets, OAuthClient};
//! use std::time::Duration;
//!
//! let secrets = ClientSecrets::load("credentials.json")?;
//! let client = OAuthClient::from_secrets(&secrets)?;
//!
//! // Opens the browser and waits for the redirect on 127.0.0.1
//! let token = AuthorizationCodeFlow::new(client.clone())
//!     .with_pkce()
//!     .run_local_server(Duration::from_secs(300))
//!     .await?;
//!
//! // Later runs
//! if token.is_expired() {
//!     let token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod sasl;
mod secrets;
pub mod token;

pub use error::{Error, Result};
pub use flow::{
    AuthorizationCodeFlow, AuthorizationResponse, LoopbackListener, OAuthClient, PkceChallenge,
};
pub use provider::{GMAIL_FULL_SCOPE, GMAIL_READONLY_SCOPE, Provider};
pub use secrets::ClientSecrets;
pub use token::Token;
