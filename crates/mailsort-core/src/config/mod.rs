//! Run configuration.
//!
//! Values are layered: built-in defaults, then the optional JSON file in the
//! user's config directory, then environment variables.

mod validation;

pub(crate) use validation::category_errors;
pub use validation::{ValidationError, ValidationResult, validate_config};

use std::path::{Path, PathBuf};
use std::time::Duration;

use mailsort_imap::SaslMechanism;
use mailsort_oauth::GMAIL_READONLY_SCOPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::CategorySet;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`Config`].
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An environment override has an unusable value.
    #[error("Invalid value for {var}: {value:?}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// The merged configuration failed validation.
    #[error("Invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// How matched categories are recorded on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Gmail labels (`X-GM-LABELS`).
    #[default]
    Gmail,
    /// Plain IMAP keywords (`+FLAGS`), for servers without the Gmail extension.
    Keyword,
}

/// SASL mechanism for presenting the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaslMode {
    /// Google's XOAUTH2.
    #[default]
    Xoauth2,
    /// RFC 7628 OAUTHBEARER.
    Oauthbearer,
}

impl From<SaslMode> for SaslMechanism {
    fn from(mode: SaslMode) -> Self {
        match mode {
            SaslMode::Xoauth2 => Self::XOAuth2,
            SaslMode::Oauthbearer => Self::OAuthBearer,
        }
    }
}

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IMAP server host.
    pub imap_host: String,
    /// IMAP server port (implicit TLS).
    pub imap_port: u16,
    /// Account address, sent as the SASL user.
    pub email: String,
    /// Folder to scan.
    pub folder: String,
    /// Category names, in matching order.
    pub categories: Vec<String>,
    /// How labels are applied.
    pub label_mode: LabelMode,
    /// SASL mechanism.
    pub sasl: SaslMode,
    /// Where the credential is persisted.
    pub token_path: PathBuf,
    /// Directory under which category folders are created.
    pub export_root: PathBuf,
    /// Google client-secrets JSON file.
    pub client_secrets_path: Option<PathBuf>,
    /// Scope requested by the interactive flow.
    pub oauth_scope: String,
    /// How long to wait for the browser redirect, in seconds.
    pub auth_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            imap_host: "imap.gmail.com".to_string(),
            imap_port: mailsort_imap::connection::IMAPS_PORT,
            email: String::new(),
            folder: "INBOX".to_string(),
            categories: CategorySet::DEFAULT.iter().map(ToString::to_string).collect(),
            label_mode: LabelMode::Gmail,
            sasl: SaslMode::Xoauth2,
            token_path: PathBuf::from("token.json"),
            export_root: PathBuf::from("."),
            client_secrets_path: None,
            oauth_scope: GMAIL_READONLY_SCOPE.to_string(),
            auth_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Location of the optional config file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mailsort").join("config.json"))
    }

    /// Loads from the default file location and the process environment,
    /// then validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or malformed, an override
    /// is unusable, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Self::default_path().as_deref(), |var| {
            std::env::var(var).ok()
        })
    }

    /// Loads from `path` (if it exists) and the given environment lookup,
    /// then validates.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file. A missing file is `Ok(None)`.
    fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        debug!(path = %path.display(), "loading config file");
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        if let Some(email) = get("MAILSORT_EMAIL") {
            self.email = email;
        }
        if let Some(host) = get("MAILSORT_IMAP_HOST") {
            self.imap_host = host;
        }
        if let Some(port) = get("MAILSORT_IMAP_PORT") {
            self.imap_port = port.trim().parse().map_err(|_| ConfigError::Env {
                var: "MAILSORT_IMAP_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(folder) = get("MAILSORT_FOLDER") {
            self.folder = folder;
        }
        if let Some(categories) = get("MAILSORT_CATEGORIES") {
            self.categories = categories
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Some(path) = get("MAILSORT_TOKEN_PATH") {
            self.token_path = PathBuf::from(path);
        }
        if let Some(path) = get("MAILSORT_EXPORT_ROOT") {
            self.export_root = PathBuf::from(path);
        }
        if let Some(path) = get("CREDENTIALS_PATH") {
            self.client_secrets_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Validates the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self).map_err(ConfigError::Invalid)
    }

    /// Category set built from [`Config::categories`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the list fails validation.
    pub fn category_set(&self) -> Result<CategorySet, ConfigError> {
        CategorySet::new(self.categories.iter().cloned()).map_err(ConfigError::Invalid)
    }

    /// Connection settings for the IMAP client.
    #[must_use]
    pub fn imap_config(&self) -> mailsort_imap::Config {
        mailsort_imap::Config::new(self.imap_host.clone()).with_port(self.imap_port)
    }

    /// Interactive authorization timeout.
    #[must_use]
    pub const fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
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
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.imap_host, "imap.gmail.com");
        assert_eq!(config.imap_port, 993);
        assert_eq!(config.folder, "INBOX");
        assert_eq!(config.categories, vec!["work", "personal", "travel"]);
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.oauth_scope, GMAIL_READONLY_SCOPE);
        assert_eq!(config.auth_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_missing_file_uses_defaults_plus_env() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with(
            Some(&dir.path().join("absent.json")),
            env_from(&[("MAILSORT_EMAIL", "me@example.com")]),
        )
        .unwrap();
        assert_eq!(config.email, "me@example.com");
        assert_eq!(config.folder, "INBOX");
    }

    #[test]
    fn test_file_then_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"email":"file@example.com","folder":"Archive","label_mode":"keyword","sasl":"oauthbearer"}"#,
        )
        .unwrap();

        let config = Config::load_with(
            Some(&path),
            env_from(&[
                ("MAILSORT_FOLDER", "INBOX"),
                ("MAILSORT_CATEGORIES", "bills, receipts ,"),
                ("MAILSORT_IMAP_PORT", "1993"),
                ("CREDENTIALS_PATH", "/tmp/secrets.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.email, "file@example.com");
        assert_eq!(config.folder, "INBOX");
        assert_eq!(config.label_mode, LabelMode::Keyword);
        assert_eq!(config.sasl, SaslMode::Oauthbearer);
        assert_eq!(config.categories, vec!["bills", "receipts"]);
        assert_eq!(config.imap_port, 1993);
        assert_eq!(
            config.client_secrets_path,
            Some(PathBuf::from("/tmp/secrets.json"))
        );
    }

    #[test]
    fn test_bad_port_env() {
        let err = Config::load_with(
            None,
            env_from(&[("MAILSORT_EMAIL", "me@example.com"), ("MAILSORT_IMAP_PORT", "imaps")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "MAILSORT_IMAP_PORT", .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Config::load_with(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validation_runs_after_merge() {
        let err = Config::load_with(None, env_from(&[])).unwrap_err();
        let ConfigError::Invalid(errors) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(errors, vec![ValidationError::EmptyEmail]);
    }

    #[test]
    fn test_sasl_mode_maps_to_mechanism() {
        assert_eq!(SaslMechanism::from(SaslMode::Xoauth2), SaslMechanism::XOAuth2);
        assert_eq!(
            SaslMechanism::from(SaslMode::Oauthbearer),
            SaslMechanism::OAuthBearer
        );
    }

    #[test]
    fn test_imap_config() {
        let config = Config {
            imap_host: "mail.example.com".into(),
            imap_port: 10993,
            ..Config::default()
        };
        let imap = config.imap_config();
        assert_eq!(imap.host, "mail.example.com");
        assert_eq!(imap.port, 10993);
    }
}
