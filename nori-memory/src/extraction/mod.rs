//! Profile Extraction - LLM-powered profile updates
//!
//! `TigerStyle`: Sim-first, deterministic, graceful degradation.
//!
//! # Architecture
//!
//! ```text
//! ProfileExtractor<P: LLMProvider, S: DocumentBackend>
//! ├── extract()              → Option<ProfileUpdate>
//! ├── parse_update()         (pure: response text → partial update)
//! └── merge::merge_update()  (pure: partial update → profile)
//! ```
//!
//! Parse failures are "no update" and never surface; transport and storage
//! failures are returned so the caller can log them.

mod merge;
mod prompts;

pub use merge::merge_update;
pub use prompts::{build_extraction_prompt, build_field_catalogue, EXTRACTION_PROMPT};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{EXTRACTION_NULL_SENTINEL, LLM_EXTRACTION_TOKENS_MAX, LLM_PROMPT_BYTES_MAX};
use crate::llm::{CompletionRequest, LLMProvider, ProviderError};
use crate::profile::{render_for_prompt, ProfileStore};
use crate::storage::{DocumentBackend, StorageError};

// =============================================================================
// Error Types
// =============================================================================

/// Errors from profile extraction.
///
/// A response that is not a JSON object is not an error; it is "no update".
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    /// The extraction completion call failed
    #[error("extraction request failed: {0}")]
    Provider(#[from] ProviderError),

    /// The profile could not be loaded or saved
    #[error("profile storage failed: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// ProfileUpdate
// =============================================================================

/// Partial profile reported by the model, kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProfileUpdate(Map<String, Value>);

impl ProfileUpdate {
    /// Reported value for a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Reported field names, in response order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of reported fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for updates handed out by the extractor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Parse a trimmed extraction response.
///
/// Empty text, the `null` sentinel, anything that is not a JSON object, and
/// the empty object all mean "nothing new".
#[must_use]
pub fn parse_update(response: &str) -> Option<Map<String, Value>> {
    let trimmed = response.trim();
    if trimmed.is_empty() || trimmed == EXTRACTION_NULL_SENTINEL {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(map),
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "extraction response is not an update");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "extraction response is not JSON");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "empty object",
    }
}

// =============================================================================
// ProfileExtractor
// =============================================================================

/// Turns one completed exchange into a merged profile update.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use nori_memory::dst::SimConfig;
/// use nori_memory::extraction::ProfileExtractor;
/// use nori_memory::llm::SimLLMProvider;
/// use nori_memory::profile::{ProfileSchema, ProfileStore};
/// use nori_memory::storage::SimStorageBackend;
///
/// #[tokio::main]
/// async fn main() {
///     let provider = SimLLMProvider::with_seed(42)
///         .with_responses([r#"{"notes": ["wants to lose 20 lbs"]}"#]);
///     let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(42)));
///     let profiles = ProfileStore::new(storage, ProfileSchema::weight_loss());
///     let extractor = ProfileExtractor::new(provider, profiles.clone());
///
///     let update = extractor
///         .extract("u1", "I want to lose 20 lbs", "Great goal!")
///         .await
///         .unwrap();
///
///     assert!(update.is_some());
///     let profile = profiles.load("u1").await.unwrap();
///     assert_eq!(profile.list("notes"), vec!["wants to lose 20 lbs"]);
/// }
/// ```
#[derive(Debug)]
pub struct ProfileExtractor<P: LLMProvider, S: DocumentBackend> {
    provider: P,
    profiles: ProfileStore<S>,
    max_tokens: usize,
}

impl<P: LLMProvider, S: DocumentBackend> ProfileExtractor<P, S> {
    /// Create an extractor writing into `profiles`.
    #[must_use]
    pub fn new(provider: P, profiles: ProfileStore<S>) -> Self {
        Self {
            provider,
            profiles,
            max_tokens: LLM_EXTRACTION_TOKENS_MAX,
        }
    }

    /// Set the output budget of the extraction call.
    ///
    /// # Panics
    /// Panics if `max_tokens` is zero.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        assert!(max_tokens > 0, "max_tokens must be positive");
        self.max_tokens = max_tokens;
        self
    }

    /// Profile store updates are written to.
    #[must_use]
    pub fn profiles(&self) -> &ProfileStore<S> {
        &self.profiles
    }

    /// Extract and merge what the exchange revealed about the user.
    ///
    /// Returns the raw reported update when one was parsed, `None` when the
    /// model reported nothing usable (no write happens then).
    ///
    /// # Errors
    /// Returns `ExtractionError` if the completion call or the profile
    /// storage fails.
    #[tracing::instrument(skip(self, user_message, assistant_response), fields(provider = self.provider.name()))]
    pub async fn extract(
        &self,
        user_id: &str,
        user_message: &str,
        assistant_response: &str,
    ) -> Result<Option<ProfileUpdate>, ExtractionError> {
        let schema = self.profiles.schema();
        let mut profile = self.profiles.load(user_id).await?;

        let prompt = build_extraction_prompt(
            schema,
            &render_for_prompt(schema, &profile),
            user_message,
            assistant_response,
        );
        if prompt.len() > LLM_PROMPT_BYTES_MAX {
            return Err(ProviderError::ContextOverflow(prompt.len()).into());
        }

        let request = CompletionRequest::new(prompt)
            .with_max_tokens(self.max_tokens)
            .with_json_mode();
        let response = self.provider.complete(&request).await?;

        let Some(update) = parse_update(&response) else {
            tracing::debug!("nothing new learned");
            return Ok(None);
        };

        let changed_count = merge_update(schema, &mut profile, &update);
        if changed_count > 0 {
            self.profiles.save(user_id, &profile).await?;
        }
        tracing::debug!(
            reported = update.len(),
            changed = changed_count,
            "profile update merged"
        );

        Ok(Some(ProfileUpdate(update)))
    }
}

// =============================================================================
// Tests
// =============================================================================
