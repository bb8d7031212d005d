//! Session - One Coaching Exchange End to End
//!
//! `TigerStyle`: Reply first, learn second. The reply is persisted before
//! extraction runs, and extraction can never fail the exchange.
//!
//! # Architecture
//!
//! ```text
//! Session<L: LLMProvider, S: DocumentBackend>
//! ├── ConversationStore<S>          (append user turn, bounded history)
//! ├── ProfileStore<S>               (profile block for the system prompt)
//! ├── PromptTemplate                (system prompt rendering)
//! ├── L::complete / complete_stream (the reply)
//! └── ProfileExtractor<Arc<L>, S>   (post-reply profile update)
//! ```

mod config;

pub use config::{SessionConfig, GREETING_DEFAULT, PRIMING_MESSAGE_DEFAULT};

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;

use crate::constants::{LLM_PROMPT_BYTES_MAX, MESSAGE_BYTES_MAX};
use crate::conversation::{ConversationStore, Turn};
use crate::extraction::{ExtractionError, ProfileExtractor, ProfileUpdate};
use crate::llm::{ChatMessage, CompletionRequest, LLMProvider, ProviderError, Role};
use crate::profile::{ProfileSchema, ProfileStore};
use crate::storage::{DocumentBackend, StorageError};
use crate::template::PromptTemplate;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that abort an exchange.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Message is empty or whitespace
    #[error("message is empty")]
    EmptyMessage,

    /// Message exceeds `MESSAGE_BYTES_MAX`
    #[error("message too long: {len} bytes (max {max})")]
    MessageTooLong {
        /// Actual length
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Conversation or profile storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The reply could not be produced
    #[error("reply failed: {0}")]
    Provider(#[from] ProviderError),
}

// =============================================================================
// Exchange
// =============================================================================

/// What happened to the profile after a reply.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// The model reported new facts; they were merged
    Updated(ProfileUpdate),
    /// Nothing new, or nothing parseable
    NoChange,
    /// Extraction failed; the reply still stands
    Failed(ExtractionError),
}

impl ExtractionOutcome {
    /// True if a profile update was reported.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// Result of one user message.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Assistant text as persisted
    pub reply: String,
    /// True if the caller stopped the stream before it finished
    pub interrupted: bool,
    /// Profile extraction result
    pub outcome: ExtractionOutcome,
}

// =============================================================================
// Session
// =============================================================================

/// Coaching session over a provider and a document backend.
///
/// Exchanges, `new_conversation` and `reset` are serialized on one lock, so
/// a session shared across tasks never interleaves two writers on the same
/// conversation log.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use nori_memory::dst::SimConfig;
/// use nori_memory::llm::SimLLMProvider;
/// use nori_memory::profile::ProfileSchema;
/// use nori_memory::session::{Session, SessionConfig};
/// use nori_memory::storage::SimStorageBackend;
///
/// #[tokio::main]
/// async fn main() {
///     let provider = SimLLMProvider::with_seed(42)
///         .with_responses(["Great goal! What's your current weight?", "null"]);
///     let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(42)));
///     let session = Session::new(provider, storage, ProfileSchema::weight_loss(), SessionConfig::default());
///
///     let exchange = session.chat("u1", "I want to lose 20 lbs").await.unwrap();
///     assert_eq!(exchange.reply, "Great goal! What's your current weight?");
///     assert_eq!(session.history("u1").await.unwrap().len(), 2);
/// }
/// ```
pub struct Session<L: LLMProvider, S: DocumentBackend> {
    provider: Arc<L>,
    conversations: ConversationStore<S>,
    profiles: ProfileStore<S>,
    extractor: ProfileExtractor<Arc<L>, S>,
    template: PromptTemplate,
    config: SessionConfig,
    exchange_lock: Mutex<()>,
}

impl<L: LLMProvider, S: DocumentBackend> Session<L, S> {
    /// Create a session using the built-in prompt template.
    #[must_use]
    pub fn new(provider: L, backend: Arc<S>, schema: ProfileSchema, config: SessionConfig) -> Self {
        let provider = Arc::new(provider);
        let conversations =
            ConversationStore::new(Arc::clone(&backend)).with_clock(config.clock.clone());
        let profiles = ProfileStore::new(backend, schema);
        let extractor = ProfileExtractor::new(Arc::clone(&provider), profiles.clone())
            .with_max_tokens(config.extraction_max_tokens);

        Self {
            provider,
            conversations,
            profiles,
            extractor,
            template: PromptTemplate::builtin(),
            config,
            exchange_lock: Mutex::new(()),
        }
    }

    /// Use `template` for the system prompt.
    #[must_use]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Handle one user message and wait for the full reply.
    ///
    /// # Errors
    /// Returns `SessionError` if the message is rejected, storage fails, or
    /// the reply call fails. Extraction failures are reported in
    /// [`Exchange::outcome`] instead.
    #[tracing::instrument(skip(self, message), fields(provider = self.provider.name(), bytes = message.len()))]
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<Exchange, SessionError> {
        let _exchange = self.exchange_lock.lock().await;
        let request = self.begin(user_id, message).await?;
        let reply = self.provider.complete(&request).await?;
        self.finish(user_id, message, reply, false).await
    }

    /// Handle one user message, handing reply fragments to `on_fragment` as
    /// they arrive.
    ///
    /// Returning `ControlFlow::Break` from the callback stops the stream; the
    /// text received so far is persisted as the reply.
    ///
    /// # Errors
    /// Same as [`Session::chat`]. A stream error before completion aborts the
    /// exchange and no assistant turn is written.
    #[tracing::instrument(skip(self, message, on_fragment), fields(provider = self.provider.name(), bytes = message.len()))]
    pub async fn chat_stream<F>(
        &self,
        user_id: &str,
        message: &str,
        mut on_fragment: F,
    ) -> Result<Exchange, SessionError>
    where
        F: FnMut(&str) -> ControlFlow<()> + Send,
    {
        let _exchange = self.exchange_lock.lock().await;
        let request = self.begin(user_id, message).await?;

        let mut reply = String::new();
        let mut interrupted = false;
        {
            let mut stream = self.provider.complete_stream(&request);
            while let Some(fragment) = stream.next().await {
                let fragment = fragment?;
                reply.push_str(&fragment);
                if on_fragment(&fragment).is_break() {
                    interrupted = true;
                    break;
                }
            }
        }

        if interrupted {
            tracing::debug!(bytes = reply.len(), "reply stream stopped by caller");
        }
        self.finish(user_id, message, reply, interrupted).await
    }

    /// Forget the conversation, keep the profile.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be rewritten.
    pub async fn new_conversation(&self, user_id: &str) -> Result<(), SessionError> {
        let _exchange = self.exchange_lock.lock().await;
        self.conversations.clear(user_id).await?;
        Ok(())
    }

    /// Reset the profile to defaults and forget the conversation.
    ///
    /// # Errors
    /// Returns a storage error if either document cannot be rewritten.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, user_id: &str) -> Result<(), SessionError> {
        let _exchange = self.exchange_lock.lock().await;
        self.profiles.reset(user_id).await?;
        self.conversations.clear(user_id).await?;
        Ok(())
    }

    /// Human-readable profile view.
    ///
    /// # Errors
    /// Returns a storage error if the profile cannot be read.
    pub async fn display_profile(&self, user_id: &str) -> Result<String, SessionError> {
        Ok(self.profiles.display(user_id).await?)
    }

    /// Profile block exactly as the model sees it.
    ///
    /// # Errors
    /// Returns a storage error if the profile cannot be read.
    pub async fn profile_text(&self, user_id: &str) -> Result<String, SessionError> {
        Ok(self.profiles.render_for_prompt(user_id).await?)
    }

    /// Full conversation log, oldest first.
    ///
    /// # Errors
    /// Returns a storage error if the log cannot be read.
    pub async fn history(&self, user_id: &str) -> Result<Vec<Turn>, SessionError> {
        Ok(self.conversations.load(user_id).await?)
    }

    /// Rendered system prompt for `user_id` as of now.
    ///
    /// # Errors
    /// Returns a storage error if the profile cannot be read.
    pub async fn system_prompt(&self, user_id: &str) -> Result<String, SessionError> {
        let profile_text = self.profiles.render_for_prompt(user_id).await?;
        Ok(self.template.render(&profile_text, self.config.clock.today()))
    }

    /// Profile store backing this session.
    #[must_use]
    pub fn profiles(&self) -> &ProfileStore<S> {
        &self.profiles
    }

    /// Conversation store backing this session.
    #[must_use]
    pub fn conversations(&self) -> &ConversationStore<S> {
        &self.conversations
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Provider used for replies and extraction.
    #[must_use]
    pub fn provider(&self) -> &L {
        &self.provider
    }

    // =========================================================================
    // Exchange phases
    // =========================================================================

    /// Validate, persist the user turn, and build the reply request.
    ///
    /// Callers hold `exchange_lock`.
    async fn begin(&self, user_id: &str, message: &str) -> Result<CompletionRequest, SessionError> {
        if message.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if message.len() > MESSAGE_BYTES_MAX {
            return Err(SessionError::MessageTooLong {
                len: message.len(),
                max: MESSAGE_BYTES_MAX,
            });
        }

        // Checked before the append so a refused message leaves no orphan turn.
        let system = self.system_prompt(user_id).await?;
        if system.len() + message.len() > LLM_PROMPT_BYTES_MAX {
            return Err(ProviderError::ContextOverflow(system.len() + message.len()).into());
        }

        self.conversations.append(user_id, Role::User, message).await?;

        let mut messages = self
            .conversations
            .recent(user_id, self.config.history_limit)
            .await?;
        let ends_with_message = messages
            .last()
            .is_some_and(|m| m.role == Role::User && m.content == message);
        if !ends_with_message {
            tracing::warn!(user_id, "conversation log changed under the exchange");
            messages.push(ChatMessage::user(message));
        }

        // First message of a conversation: show the model its own greeting.
        if messages.len() == 1 {
            let mut primed = vec![
                ChatMessage::user(self.config.priming_message.clone()),
                ChatMessage::assistant(self.config.greeting.clone()),
            ];
            primed.append(&mut messages);
            messages = primed;
        }

        let dropped = fit_to_budget(&mut messages, LLM_PROMPT_BYTES_MAX - system.len());
        if dropped > 0 {
            tracing::debug!(user_id, dropped, "oldest turns left out of the prompt");
        }

        let request = CompletionRequest::chat(messages)
            .with_system(system)
            .with_max_tokens(self.config.reply_max_tokens);

        // Postcondition
        assert!(request.prompt_bytes() <= LLM_PROMPT_BYTES_MAX);
        Ok(request)
    }

    /// Persist the reply, then run extraction.
    async fn finish(
        &self,
        user_id: &str,
        message: &str,
        reply: String,
        interrupted: bool,
    ) -> Result<Exchange, SessionError> {
        self.conversations
            .append(user_id, Role::Assistant, &reply)
            .await?;

        let outcome = match self.extractor.extract(user_id, message, &reply).await {
            Ok(Some(update)) => ExtractionOutcome::Updated(update),
            Ok(None) => ExtractionOutcome::NoChange,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "profile extraction failed");
                ExtractionOutcome::Failed(e)
            }
        };

        Ok(Exchange {
            reply,
            interrupted,
            outcome,
        })
    }
}

/// Drop the oldest messages until the rest fit in `budget` bytes, keeping
/// the newest message and opening on a user turn. Returns how many were
/// dropped.
///
/// # Panics
/// Panics if `messages` is empty or the newest message alone exceeds `budget`.
fn fit_to_budget(messages: &mut Vec<ChatMessage>, budget: usize) -> usize {
    assert!(!messages.is_empty(), "messages must not be empty");
    let newest = messages.len() - 1;
    assert!(
        messages[newest].content.len() <= budget,
        "newest message exceeds the prompt budget"
    );

    let mut start = newest;
    let mut kept = messages[newest].content.len();
    while start > 0 && kept + messages[start - 1].content.len() <= budget {
        start -= 1;
        kept += messages[start].content.len();
    }
    while start < newest && messages[start].role != Role::User {
        start += 1;
    }

    messages.drain(..start);
    start
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{Clock, DeterministicRng, FaultConfig, FaultInjector, FaultType, SimClock, SimConfig};
    use crate::llm::SimLLMProvider;
    use crate::storage::{Document, SimStorageBackend};
    use serde_json::json;

    fn session_with(
        responses: &[&str],
    ) -> (
        Session<SimLLMProvider, SimStorageBackend>,
        SimLLMProvider,
        Arc<SimStorageBackend>,
    ) {
        let provider = SimLLMProvider::with_seed(42).with_responses(responses.iter().copied());
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(42)));
        let config = SessionConfig::default()
            .with_clock(Clock::Sim(SimClock::at_date(2025, 1, 15)));
        let session = Session::new(
            provider.clone(),
            Arc::clone(&storage),
            ProfileSchema::weight_loss(),
            config,
        )
        .with_template(PromptTemplate::from_text(
            "Coach. Today is {current_date}.\n{user_profile}",
            "",
        ));
        (session, provider, storage)
    }

    #[tokio::test]
    async fn test_first_message_is_primed() {
        let (session, provider, _) = session_with(&["Great goal!", "null"]);

        session.chat("u1", "I want to lose 20 lbs").await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0], ChatMessage::user("hi"));
        assert_eq!(request.messages[1], ChatMessage::assistant(GREETING_DEFAULT));
        assert_eq!(request.messages[2], ChatMessage::user("I want to lose 20 lbs"));
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(
            request.system.as_deref(),
            Some("Coach. Today is January 15, 2025.\nNo information known yet about this person.")
        );
    }

    #[tokio::test]
    async fn test_later_messages_are_not_primed() {
        let (session, provider, _) = session_with(&["One", "null", "Two", "null"]);

        session.chat("u1", "first").await.unwrap();
        session.chat("u1", "second").await.unwrap();

        let request = &provider.requests()[2];
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "One", "second"]);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let provider = SimLLMProvider::with_seed(7);
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(7)));
        let session = Session::new(
            provider.clone(),
            storage,
            ProfileSchema::health(),
            SessionConfig::default().with_history_limit(4),
        );

        for i in 0..5 {
            session.chat("u1", &format!("message {i}")).await.unwrap();
        }

        let last_reply_request = provider
            .requests()
            .into_iter()
            .filter(|r| !r.json_mode)
            .last()
            .unwrap();
        assert_eq!(last_reply_request.messages.len(), 4);
        assert_eq!(
            last_reply_request.messages.last().unwrap().content,
            "message 4"
        );
        assert_eq!(session.history("u1").await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_extraction_updates_profile() {
        let (session, _, _) =
            session_with(&["Great goal!", r#"{"notes": ["wants to lose 20 lbs"]}"#]);

        let exchange = session.chat("u1", "I want to lose 20 lbs").await.unwrap();

        assert!(exchange.outcome.is_updated());
        let profile = session.profiles().load("u1").await.unwrap();
        assert_eq!(profile.list("notes"), vec!["wants to lose 20 lbs"]);
        assert!(session
            .profile_text("u1")
            .await
            .unwrap()
            .contains("Other notes: wants to lose 20 lbs"));
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_reply() {
        let mut injector = FaultInjector::new(DeterministicRng::new(1));
        // The reply streams; only extraction goes through `complete`.
        injector.register(
            FaultConfig::new(FaultType::LlmServiceUnavailable, 1.0).with_filter("llm_complete"),
        );
        let provider = SimLLMProvider::with_faults(1, Arc::new(injector));
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(1)));
        let session = Session::new(provider, Arc::clone(&storage), ProfileSchema::weight_loss(), SessionConfig::default());

        let exchange = session.chat_stream("u1", "hello", |_| ControlFlow::Continue(())).await.unwrap();

        assert!(!exchange.reply.is_empty());
        assert!(matches!(exchange.outcome, ExtractionOutcome::Failed(ExtractionError::Provider(_))));
        assert_eq!(session.history("u1").await.unwrap().len(), 2);
        assert!(storage.snapshot("u1", Document::Profile).is_none());
    }

    #[tokio::test]
    async fn test_reply_failure_keeps_user_turn_only() {
        let mut injector = FaultInjector::new(DeterministicRng::new(1));
        injector.register(FaultConfig::new(FaultType::LlmTimeout, 1.0));
        let provider = SimLLMProvider::with_faults(1, Arc::new(injector));
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(1)));
        let session = Session::new(provider, storage, ProfileSchema::weight_loss(), SessionConfig::default());

        let result = session.chat("u1", "hello").await;

        assert!(matches!(result, Err(SessionError::Provider(ProviderError::Timeout))));
        let history = session.history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_stream_stopped_early_persists_partial_reply() {
        let (session, _, _) = session_with(&["one two three four", "null"]);

        let mut seen = Vec::new();
        let exchange = session
            .chat_stream("u1", "hello", |fragment| {
                seen.push(fragment.to_string());
                if seen.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await
            .unwrap();

        assert!(exchange.interrupted);
        assert_eq!(exchange.reply, "one two ");
        let history = session.history("u1").await.unwrap();
        assert_eq!(history[1].content, "one two ");
    }

    #[tokio::test]
    async fn test_stream_full_reply_matches_fragments() {
        let (session, _, _) = session_with(&["Tell me about your week.", "null"]);

        let mut streamed = String::new();
        let exchange = session
            .chat_stream("u1", "hi there", |fragment| {
                streamed.push_str(fragment);
                ControlFlow::Continue(())
            })
            .await
            .unwrap();

        assert!(!exchange.interrupted);
        assert_eq!(streamed, "Tell me about your week.");
        assert_eq!(exchange.reply, streamed);
        assert!(matches!(exchange.outcome, ExtractionOutcome::NoChange));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_messages() {
        let (session, provider, storage) = session_with(&[]);

        assert!(matches!(session.chat("u1", "   ").await, Err(SessionError::EmptyMessage)));
        let huge = "x".repeat(MESSAGE_BYTES_MAX + 1);
        assert!(matches!(
            session.chat("u1", &huge).await,
            Err(SessionError::MessageTooLong { .. })
        ));
        assert!(provider.requests().is_empty());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_long_history_is_trimmed_to_prompt_budget() {
        let provider = SimLLMProvider::with_seed(3);
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(3)));
        let session = Session::new(
            provider.clone(),
            storage,
            ProfileSchema::weight_loss(),
            SessionConfig::default().with_history_limit(40),
        );

        // Twenty full-size messages overflow the prompt budget well before
        // the forty-turn window does.
        let long = "x".repeat(MESSAGE_BYTES_MAX);
        for _ in 0..20 {
            session.chat("u1", &long).await.unwrap();
        }
        session.chat("u1", "short message").await.unwrap();

        let request = provider
            .requests()
            .into_iter()
            .filter(|r| !r.json_mode)
            .last()
            .unwrap();
        assert!(request.prompt_bytes() <= LLM_PROMPT_BYTES_MAX);
        assert!(request.messages.len() < 40);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.messages.last().unwrap().content, "short message");

        let history = session.history("u1").await.unwrap();
        assert_eq!(history.len(), 42);
        assert!(history.windows(2).all(|pair| pair[0].role != pair[1].role));
    }

    #[tokio::test]
    async fn test_refused_prompt_leaves_no_turn() {
        let provider = SimLLMProvider::with_seed(5);
        let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(5)));
        let huge_template = "x".repeat(LLM_PROMPT_BYTES_MAX);
        let session = Session::new(provider.clone(), Arc::clone(&storage), ProfileSchema::weight_loss(), SessionConfig::default())
            .with_template(PromptTemplate::from_text(&huge_template, ""));

        let result = session.chat("u1", "hello").await;

        assert!(matches!(
            result,
            Err(SessionError::Provider(ProviderError::ContextOverflow(_)))
        ));
        assert!(provider.requests().is_empty());
        assert!(session.history("u1").await.unwrap().is_empty());
    }

    #[test]
    fn test_fit_to_budget_opens_on_user_turn() {
        let mut messages = vec![
            ChatMessage::user("aaaa"),
            ChatMessage::assistant("bbbb"),
            ChatMessage::user("cccc"),
            ChatMessage::assistant("dd"),
            ChatMessage::user("ee"),
        ];

        // Everything from "bbbb" on fits in 12, but the window may not open
        // on the coach.
        let dropped = fit_to_budget(&mut messages, 12);

        assert_eq!(dropped, 2);
        assert_eq!(messages[0], ChatMessage::user("cccc"));
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn test_fit_to_budget_keeps_everything_that_fits() {
        let mut messages = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello"), ChatMessage::user("ok")];
        assert_eq!(fit_to_budget(&mut messages, 100), 0);
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_new_conversation_keeps_profile() {
        let (session, _, _) = session_with(&["Nice to meet you, Sam.", r#"{"name": "Sam"}"#]);
        session.chat("u1", "I'm Sam").await.unwrap();

        session.new_conversation("u1").await.unwrap();

        assert!(session.history("u1").await.unwrap().is_empty());
        let profile = session.profiles().load("u1").await.unwrap();
        assert_eq!(profile.get("name"), Some(&json!("Sam")));
    }

    #[tokio::test]
    async fn test_reset_clears_both() {
        let (session, _, _) = session_with(&["Nice to meet you, Sam.", r#"{"name": "Sam"}"#]);
        session.chat("u1", "I'm Sam").await.unwrap();

        session.reset("u1").await.unwrap();

        assert!(session.history("u1").await.unwrap().is_empty());
        assert_eq!(
            session.profile_text("u1").await.unwrap(),
            "No information known yet about this person."
        );
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (session, _, _) = session_with(&["Hi A", r#"{"name": "A"}"#, "Hi B", "null"]);

        session.chat("alice", "I'm A").await.unwrap();
        session.chat("bob", "hello").await.unwrap();

        assert_eq!(session.history("alice").await.unwrap().len(), 2);
        assert_eq!(session.history("bob").await.unwrap().len(), 2);
        let bob = session.profiles().load("bob").await.unwrap();
        assert_eq!(bob.get("name"), Some(&json!(null)));
    }
}
