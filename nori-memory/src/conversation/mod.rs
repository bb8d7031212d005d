//! Conversation Store - Append-Only Turn Log per User
//!
//! `TigerStyle`: The whole log is one JSON document, rewritten on every
//! append. Reads for model context are a plain tail slice; turns that scroll
//! out of the window stay on disk.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dst::Clock;
use crate::llm::{ChatMessage, Role};
use crate::storage::{Document, DocumentBackend, StorageResult};

/// One persisted message.
///
/// Immutable once written; identity is its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Author
    pub role: Role,
    /// Message text
    pub content: String,
    /// Local wall-clock time of the append, without timezone
    pub timestamp: NaiveDateTime,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        ChatMessage::new(turn.role, turn.content.clone())
    }
}

/// Per-user conversation log over a [`DocumentBackend`].
#[derive(Debug)]
pub struct ConversationStore<S: DocumentBackend> {
    backend: Arc<S>,
    clock: Clock,
}

impl<S: DocumentBackend> Clone for ConversationStore<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            clock: self.clock.clone(),
        }
    }
}

impl<S: DocumentBackend> ConversationStore<S> {
    /// Create a store using the system clock for timestamps.
    #[must_use]
    pub fn new(backend: Arc<S>) -> Self {
        Self {
            backend,
            clock: Clock::System,
        }
    }

    /// Use `clock` for turn timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Full log with timestamps, oldest first. Missing log reads as empty.
    ///
    /// # Errors
    /// Returns a storage error if the document cannot be read or parsed.
    pub async fn load(&self, user_id: &str) -> StorageResult<Vec<Turn>> {
        match self.backend.read(user_id, Document::Conversation).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append one turn stamped with the current time.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be read or rewritten.
    #[tracing::instrument(skip(self, content), fields(role = role.as_str(), bytes = content.len()))]
    pub async fn append(&self, user_id: &str, role: Role, content: &str) -> StorageResult<()> {
        let mut turns = self.load(user_id).await?;
        let count_before = turns.len();

        turns.push(Turn {
            role,
            content: content.to_string(),
            timestamp: self.clock.now(),
        });

        // Postcondition
        debug_assert_eq!(turns.len(), count_before + 1, "append must add one turn");

        self.save(user_id, &turns).await
    }

    /// The last `limit` turns as role/content pairs, oldest first.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be read.
    pub async fn recent(&self, user_id: &str, limit: usize) -> StorageResult<Vec<ChatMessage>> {
        let turns = self.load(user_id).await?;
        let start = turns.len().saturating_sub(limit);
        let window: Vec<ChatMessage> = turns[start..].iter().map(ChatMessage::from).collect();

        // Postcondition
        debug_assert!(window.len() <= limit, "window must respect limit");
        Ok(window)
    }

    /// Truncate the log to empty. Idempotent; a missing log stays missing.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be rewritten.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: &str) -> StorageResult<()> {
        if self
            .backend
            .read(user_id, Document::Conversation)
            .await?
            .is_none()
        {
            return Ok(());
        }
        self.save(user_id, &[]).await
    }

    /// Number of stored turns.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be read.
    pub async fn len(&self, user_id: &str) -> StorageResult<usize> {
        Ok(self.load(user_id).await?.len())
    }

    async fn save(&self, user_id: &str, turns: &[Turn]) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(turns)?;
        self.backend
            .write(user_id, Document::Conversation, &bytes)
            .await
    }
}
