//! Errors from the document stores.

use thiserror::Error;

use crate::dst::FaultType;

/// What went wrong reading or writing a user's documents.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Rejected before touching storage: bad user id, oversized document
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Reading a document failed
    #[error("read failed: {0}")]
    Read(String),

    /// Writing a document failed; the previous version is intact
    #[error("write failed: {0}")]
    Write(String),

    /// Stored bytes are not the JSON shape expected for the document
    #[error("corrupt document: {0}")]
    Corrupt(String),

    /// A value could not be encoded as JSON
    #[error("encode failed: {0}")]
    Encode(String),

    /// Fault injected by the simulated backend
    #[error("injected fault {fault:?} during {operation}")]
    Injected {
        /// Fault that fired
        fault: FaultType,
        /// Operation it fired on, e.g. `storage_write:profile`
        operation: String,
    },
}

impl StorageError {
    /// [`StorageError::Invalid`].
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => Self::Encode(err.to_string()),
            _ => Self::Corrupt(err.to_string()),
        }
    }
}

/// Result of a storage operation.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_json_is_corrupt() {
        let err = serde_json::from_str::<Vec<String>>("{\"role\": ").unwrap_err();
        assert!(matches!(StorageError::from(err), StorageError::Corrupt(_)));
    }

    #[test]
    fn test_injected_names_operation() {
        let err = StorageError::Injected {
            fault: FaultType::StorageWriteFail,
            operation: "storage_write:profile".into(),
        };
        assert_eq!(
            err.to_string(),
            "injected fault StorageWriteFail during storage_write:profile"
        );
    }
}
