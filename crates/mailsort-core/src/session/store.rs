//! Persistent credential storage.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mailsort_oauth::Token;
use tracing::debug;

/// Error type for credential storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The credential file could not be read or written.
    #[error("Credential file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The credential file does not hold a token.
    #[error("Credential file {path} is not a valid token: {source}")]
    Format {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Where the credential lives between runs.
pub trait CredentialStore {
    /// Loads the stored token. `Ok(None)` means nothing is stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored token exists but cannot be read.
    fn load(&self) -> Result<Option<Token>, StoreError>;

    /// Replaces the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be written.
    fn save(&self, token: &Token) -> Result<(), StoreError>;
}

/// Token kept as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`. Nothing is touched until used.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Token>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored credential");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let token = serde_json::from_str(&json).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Loaded stored credential");
        Ok(Some(token))
    }

    fn save(&self, token: &Token) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(token).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        let temp = self.temp_path();
        write_private(&temp, &json).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Stored credential");
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
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
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_token() -> Token {
        let mut token = Token::new("ya29.access", "Bearer")
            .with_refresh_token("1//refresh")
            .with_expires_at(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap());
        token.scope = Some("https://www.googleapis.com/auth/gmail.readonly".into());
        token
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/dir/token.json"));

        store.save(&sample_token()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_token()));
        assert!(!dir.path().join("nested/dir/token.json.tmp").exists());
    }

    #[test]
    fn save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));

        store.save(&sample_token()).unwrap();
        let newer = Token::new("ya29.newer", "Bearer");
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap(), Some(newer));
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();

        let err = FileCredentialStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Format { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
