//! Attachment export into per-category directories.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::category::{Category, CategorySet};

/// What [`Exporter::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file did not exist and was written.
    Written,
    /// A file with that name was already there; it was left untouched.
    AlreadyExists,
}

/// Writes attachments under `<root>/<category>/<filename>`.
#[derive(Debug, Clone)]
pub struct Exporter {
    root: PathBuf,
}

impl Exporter {
    /// Creates an exporter rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Export root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory for every category.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from directory creation.
    pub async fn prepare(&self, categories: &CategorySet) -> io::Result<()> {
        for category in categories.iter() {
            let dir = self.root.join(category.as_str());
            fs::create_dir_all(&dir).await?;
            debug!(dir = %dir.display(), "Category directory ready");
        }
        Ok(())
    }

    /// Destination path for an attachment. The filename is used as given.
    #[must_use]
    pub fn path_for(&self, category: &Category, filename: &str) -> PathBuf {
        self.root.join(category.as_str()).join(filename)
    }

    /// Writes `bytes` unless the destination already exists.
    ///
    /// The bytes go to a hidden sibling file first, which is then hard-linked
    /// to the destination. Linking never replaces an existing file, and the
    /// destination only appears once it is complete, so an interrupted
    /// write never leaves a partial attachment behind.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than the file already existing.
    pub async fn save(
        &self,
        category: &Category,
        filename: &str,
        bytes: &[u8],
    ) -> io::Result<SaveOutcome> {
        let path = self.path_for(category, filename);
        if fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Attachment already exported");
            return Ok(SaveOutcome::AlreadyExists);
        }

        let staging = staging_path(&path);
        if let Err(e) = fs::write(&staging, bytes).await {
            discard(&staging).await;
            return Err(e);
        }

        let linked = fs::hard_link(&staging, &path).await;
        discard(&staging).await;
        match linked {
            Ok(()) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Attachment written");
                Ok(SaveOutcome::Written)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Attachment already exported");
                Ok(SaveOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".part");
    path.with_file_name(name)
}

async fn discard(staging: &Path) {
    if let Err(e) = fs::remove_file(staging).await
        && e.kind() != io::ErrorKind::NotFound
    {
        debug!(path = %staging.display(), error = %e, "Could not remove staging file");
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

    fn category(set: &CategorySet, name: &str) -> Category {
        set.get(name).unwrap().clone()
    }

    #[tokio::test]
    async fn prepare_creates_every_directory() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let set = CategorySet::default();

        exporter.prepare(&set).await.unwrap();
        exporter.prepare(&set).await.unwrap();

        for name in CategorySet::DEFAULT {
            assert!(dir.path().join(name).is_dir());
        }
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let set = CategorySet::default();
        exporter.prepare(&set).await.unwrap();
        let travel = category(&set, "travel");

        let first = exporter.save(&travel, "ticket.pdf", b"first").await.unwrap();
        let second = exporter.save(&travel, "ticket.pdf", b"second").await.unwrap();

        assert_eq!(first, SaveOutcome::Written);
        assert_eq!(second, SaveOutcome::AlreadyExists);
        let on_disk = std::fs::read(exporter.path_for(&travel, "ticket.pdf")).unwrap();
        assert_eq!(on_disk, b"first");
    }

    #[tokio::test]
    async fn same_filename_in_two_categories() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let set = CategorySet::default();
        exporter.prepare(&set).await.unwrap();

        for name in ["travel", "personal"] {
            let outcome = exporter
                .save(&category(&set, name), "photo.jpg", b"\xff\xd8")
                .await
                .unwrap();
            assert_eq!(outcome, SaveOutcome::Written);
        }
        assert!(dir.path().join("travel/photo.jpg").is_file());
        assert!(dir.path().join("personal/photo.jpg").is_file());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let set = CategorySet::default();
        exporter.prepare(&set).await.unwrap();
        let work = category(&set, "work");
        // A directory in the staging slot makes the write fail.
        let blocker = dir.path().join("work/.notes.txt.part");
        std::fs::create_dir(&blocker).unwrap();

        assert!(exporter.save(&work, "notes.txt", b"agenda").await.is_err());
        assert!(!exporter.path_for(&work, "notes.txt").exists());

        std::fs::remove_dir(&blocker).unwrap();
        let outcome = exporter.save(&work, "notes.txt", b"agenda").await.unwrap();
        assert_eq!(outcome, SaveOutcome::Written);
        let on_disk = std::fs::read(exporter.path_for(&work, "notes.txt")).unwrap();
        assert_eq!(on_disk, b"agenda");
    }

    #[tokio::test]
    async fn stale_staging_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let set = CategorySet::default();
        exporter.prepare(&set).await.unwrap();
        let travel = category(&set, "travel");
        let stale = dir.path().join("travel/.ticket.pdf.part");
        std::fs::write(&stale, b"trunc").unwrap();

        let outcome = exporter.save(&travel, "ticket.pdf", b"complete").await.unwrap();

        assert_eq!(outcome, SaveOutcome::Written);
        let on_disk = std::fs::read(exporter.path_for(&travel, "ticket.pdf")).unwrap();
        assert_eq!(on_disk, b"complete");
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("nowhere"));
        let set = CategorySet::default();

        let err = exporter
            .save(&category(&set, "work"), "a.txt", b"x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
