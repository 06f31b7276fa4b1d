//! Google client-secrets files (`credentials.json`).

use crate::error::{Error, Result};
use crate::provider::{GMAIL_READONLY_SCOPE, Provider};
use serde::Deserialize;
use std::path::Path;

/// Registered OAuth client as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// Client ID.
    pub client_id: String,
    /// Client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum SecretsFile {
    Installed(ClientSecrets),
    Web(ClientSecrets),
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecrets {
    /// Parses a client-secrets document with an `installed` or `web` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the client id is empty.
    pub fn from_json(json: &str) -> Result<Self> {
        let secrets = match serde_json::from_str::<SecretsFile>(json)? {
            SecretsFile::Installed(s) | SecretsFile::Web(s) => s,
        };
        if secrets.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }
        Ok(secrets)
    }

    /// Reads and parses a client-secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Provider built from the endpoints in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL.
    pub fn provider(&self) -> Result<Provider> {
        let provider = Provider::new("Google", &self.auth_uri, &self.token_uri)?
            .with_default_scopes(vec![GMAIL_READONLY_SCOPE.to_string()]);
        provider.validate()?;
        Ok(provider)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "mailsort",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "GOCSPX-abc",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_installed_section() {
        let secrets = ClientSecrets::from_json(INSTALLED).unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("GOCSPX-abc"));

        let provider = secrets.provider().unwrap();
        assert!(provider.is_google());
        assert_eq!(provider.token_url.as_str(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_web_section_with_defaults() {
        let secrets = ClientSecrets::from_json(r#"{"web":{"client_id":"w"}}"#).unwrap();
        assert_eq!(secrets.client_id, "w");
        assert!(secrets.client_secret.is_none());
        assert_eq!(secrets.auth_uri, default_auth_uri());
    }

    #[test]
    fn test_rejects_unknown_layout() {
        assert!(ClientSecrets::from_json(r#"{"client_id":"x"}"#).is_err());
        assert!(ClientSecrets::from_json(r#"{"installed":{"client_id":" "}}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, INSTALLED).unwrap();

        assert!(ClientSecrets::load(&path).is_ok());
        assert!(matches!(
            ClientSecrets::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
