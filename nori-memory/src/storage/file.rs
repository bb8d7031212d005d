//! `FileBackend` - One Directory per User
//!
//! Layout: `<root>/<user_id>/conversations.json` and
//! `<root>/<user_id>/profile.json`. Writes go to a hidden temp file in the
//! same directory and are renamed over the target.
//!
//! Only the profile has a size cap; the conversation log grows without bound.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::backend::{validate_user_id, Document, DocumentBackend};
use super::error::{StorageError, StorageResult};
use crate::constants::PROFILE_BYTES_MAX;

/// Filesystem-backed document storage.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    writes_count: AtomicU64,
}

impl FileBackend {
    /// Create a backend rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writes_count: AtomicU64::new(0),
        }
    }

    /// Data directory holding one sub-directory per user.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one user.
    ///
    /// # Errors
    /// Returns `StorageError::Invalid` if the user id is not a single path
    /// component.
    pub fn user_dir(&self, user_id: &str) -> StorageResult<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.root.join(user_id))
    }

    fn document_path(&self, user_id: &str, document: Document) -> StorageResult<PathBuf> {
        Ok(self.user_dir(user_id)?.join(document.file_name()))
    }
}

fn check_size(document: Document, len: usize) -> StorageResult<()> {
    if document == Document::Profile && len > PROFILE_BYTES_MAX {
        return Err(StorageError::invalid(format!(
            "profile of {len} bytes exceeds {PROFILE_BYTES_MAX} bytes"
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentBackend for FileBackend {
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn read(&self, user_id: &str, document: Document) -> StorageResult<Option<Vec<u8>>> {
        let path = self.document_path(user_id, document)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                check_size(document, bytes.len())?;
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read(format!("{}: {e}", path.display()))),
        }
    }

    #[tracing::instrument(skip(self, bytes), fields(root = %self.root.display(), bytes = bytes.len()))]
    async fn write(&self, user_id: &str, document: Document, bytes: &[u8]) -> StorageResult<()> {
        // Preconditions
        check_size(document, bytes.len())?;

        let dir = self.user_dir(user_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {e}", dir.display())))?;

        let target = dir.join(document.file_name());
        let sequence = self.writes_count.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(
            ".{}.{}.{sequence}.tmp",
            document.file_name(),
            std::process::id()
        ));

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::Write(format!("{}: {e}", tmp.display())));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::Write(format!("{}: {e}", target.display())));
        }

        tracing::debug!(path = %target.display(), "document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_document_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let result = backend.read("u1", Document::Profile).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend
            .write("u1", Document::Conversation, b"[]")
            .await
            .unwrap();

        let stored = backend.read("u1", Document::Conversation).await.unwrap();
        assert_eq!(stored.as_deref(), Some(&b"[]"[..]));
        assert!(dir.path().join("u1").join("conversations.json").is_file());
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.write("u1", Document::Profile, b"{}").await.unwrap();
        backend
            .write("u1", Document::Profile, b"{\"name\":\"Sam\"}")
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("u1"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["profile.json".to_string()]);
    }

    #[tokio::test]
    async fn test_only_profile_is_size_capped() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let large = vec![b' '; PROFILE_BYTES_MAX + 1];

        let err = backend
            .write("u1", Document::Profile, &large)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));

        backend
            .write("u1", Document::Conversation, &large)
            .await
            .unwrap();
        let stored = backend.read("u1", Document::Conversation).await.unwrap();
        assert_eq!(stored.map(|bytes| bytes.len()), Some(PROFILE_BYTES_MAX + 1));
    }

    #[tokio::test]
    async fn test_rejects_path_like_user_ids() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let err = backend
            .write("../escape", Document::Profile, b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));
        assert!(backend.read("", Document::Profile).await.is_err());
    }
}
