//! Document Backend Trait
//!
//! Every user owns exactly two documents (the conversation log and the
//! profile). Backends move opaque bytes; the stores above decide the JSON
//! shape.

use async_trait::async_trait;

use super::error::{StorageError, StorageResult};
use crate::constants::USER_ID_BYTES_MAX;

/// A named per-user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Append-only turn log
    Conversation,
    /// Structured fact sheet
    Profile,
}

impl Document {
    /// File name used on disk.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Conversation => "conversations.json",
            Self::Profile => "profile.json",
        }
    }
}

/// Where per-user documents live.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read a document. Returns `None` if it was never written.
    async fn read(&self, user_id: &str, document: Document) -> StorageResult<Option<Vec<u8>>>;

    /// Replace a document wholesale.
    ///
    /// Readers observe either the previous or the new content, never a mix.
    async fn write(&self, user_id: &str, document: Document, bytes: &[u8]) -> StorageResult<()>;
}

/// Check that `user_id` is usable as a single path component.
///
/// # Errors
/// Returns `StorageError::Invalid` for empty ids, `.`/`..`, ids with path
/// separators or NUL, and ids longer than `USER_ID_BYTES_MAX`.
pub fn validate_user_id(user_id: &str) -> StorageResult<()> {
    if user_id.is_empty() {
        return Err(StorageError::invalid("user id must not be empty"));
    }
    if user_id.len() > USER_ID_BYTES_MAX {
        return Err(StorageError::invalid(format!(
            "user id exceeds {USER_ID_BYTES_MAX} bytes"
        )));
    }
    if user_id == "." || user_id == ".." {
        return Err(StorageError::invalid(format!(
            "user id must not be {user_id:?}"
        )));
    }
    if user_id.contains(['/', '\\', '\0']) {
        return Err(StorageError::invalid(format!(
            "user id {user_id:?} must be a single path component"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_file_names() {
        assert_eq!(Document::Conversation.file_name(), "conversations.json");
        assert_eq!(Document::Profile.file_name(), "profile.json");
    }

    #[test]
    fn test_validate_user_id_accepts_plain_ids() {
        assert!(validate_user_id("u1").is_ok());
        assert!(validate_user_id("default").is_ok());
        assert!(validate_user_id("alice.smith").is_ok());
    }

    #[test]
    fn test_validate_user_id_rejects_paths() {
        for bad in ["", ".", "..", "a/b", "../etc", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_user_id(bad), Err(StorageError::Invalid(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_user_id(&"x".repeat(USER_ID_BYTES_MAX + 1)).is_err());
    }
}
