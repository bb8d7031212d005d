//! `ProfileStore` - Persistence for Profiles
//!
//! `TigerStyle`: Default-merge on load, full overwrite on save.

use std::sync::Arc;

use serde_json::Value;

use super::{backfill, default_profile, render_display, render_for_prompt, Profile, ProfileSchema};
use crate::storage::{Document, DocumentBackend, StorageError, StorageResult};

/// Per-user profile persistence for one schema.
#[derive(Debug)]
pub struct ProfileStore<S: DocumentBackend> {
    backend: Arc<S>,
    schema: Arc<ProfileSchema>,
}

impl<S: DocumentBackend> Clone for ProfileStore<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<S: DocumentBackend> ProfileStore<S> {
    /// Create a store for `schema` over `backend`.
    #[must_use]
    pub fn new(backend: Arc<S>, schema: ProfileSchema) -> Self {
        Self {
            backend,
            schema: Arc::new(schema),
        }
    }

    /// The schema this store merges against.
    #[must_use]
    pub fn schema(&self) -> &ProfileSchema {
        &self.schema
    }

    /// Load a profile: schema defaults on first access, otherwise stored
    /// values merged over fresh defaults.
    ///
    /// # Errors
    /// Returns a storage error if the document cannot be read, or if it holds
    /// something other than a JSON object.
    #[tracing::instrument(skip(self), fields(schema = self.schema.name()))]
    pub async fn load(&self, user_id: &str) -> StorageResult<Profile> {
        let Some(bytes) = self.backend.read(user_id, Document::Profile).await? else {
            return Ok(default_profile(&self.schema));
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(stored) => Ok(backfill(&self.schema, stored)),
            other => Err(StorageError::Corrupt(format!(
                "profile for {user_id} is not a JSON object: {other}"
            ))),
        }
    }

    /// Overwrite the stored profile (last write wins).
    ///
    /// # Errors
    /// Returns a storage error if the document cannot be written.
    #[tracing::instrument(skip(self, profile), fields(fields = profile.len()))]
    pub async fn save(&self, user_id: &str, profile: &Profile) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(profile)?;
        self.backend.write(user_id, Document::Profile, &bytes).await
    }

    /// Replace the stored profile with schema defaults.
    ///
    /// # Errors
    /// Returns a storage error if the document cannot be written.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, user_id: &str) -> StorageResult<()> {
        self.save(user_id, &default_profile(&self.schema)).await
    }

    /// Prompt text for the stored profile.
    ///
    /// # Errors
    /// Returns a storage error if the profile cannot be loaded.
    pub async fn render_for_prompt(&self, user_id: &str) -> StorageResult<String> {
        let profile = self.load(user_id).await?;
        Ok(render_for_prompt(&self.schema, &profile))
    }

    /// Full human-readable view of the stored profile.
    ///
    /// # Errors
    /// Returns a storage error if the profile cannot be loaded.
    pub async fn display(&self, user_id: &str) -> StorageResult<String> {
        let profile = self.load(user_id).await?;
        Ok(render_display(&self.schema, &profile))
    }
}
