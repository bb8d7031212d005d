//! Completion providers.
//!
//! The session talks to the model only through [`LLMProvider`]. Two
//! implementations ship:
//!
//! ```text
//! LLMProvider
//! ├── SimLLMProvider     scripted or seeded replies, fault injection
//! ├── AnthropicProvider  Messages API over HTTPS (feature `anthropic`)
//! └── Arc<P>             so a provider picked at runtime can be shared
//! ```
//!
//! ```rust
//! use nori_memory::llm::{ChatMessage, CompletionRequest, LLMProvider, SimLLMProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = SimLLMProvider::with_seed(42).with_responses(["Nice to meet you!"]);
//!     let request = CompletionRequest::chat(vec![ChatMessage::user("hi")])
//!         .with_system("You are a weight loss coach.");
//!
//!     assert_eq!(provider.complete(&request).await.unwrap(), "Nice to meet you!");
//! }
//! ```

mod error;
mod sim;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use error::ProviderError;
pub use sim::SimLLMProvider;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, ANTHROPIC_MODEL_DEFAULT};

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::constants::LLM_PROMPT_BYTES_MAX;

/// Who said something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person being coached
    User,
    /// The coach
    Assistant,
}

impl Role {
    /// Name used on the wire and on disk.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A message in the history handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: Role,
    /// What they wrote
    pub content: String,
}

impl ChatMessage {
    /// Message from `role`.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Message from the user.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Message from the coach.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Everything a provider needs for one completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt
    pub system: Option<String>,
    /// History, oldest first, never empty
    pub messages: Vec<ChatMessage>,
    /// Output cap; provider default when unset
    pub max_tokens: Option<usize>,
    /// Sampling temperature in `[0, 1]`; provider default when unset
    pub temperature: Option<f32>,
    /// The caller will parse the answer as JSON
    pub json_mode: bool,
}

impl CompletionRequest {
    /// One-shot request: a single user prompt, no history.
    ///
    /// # Panics
    /// Panics if `prompt` is empty or longer than `LLM_PROMPT_BYTES_MAX`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        assert!(!prompt.is_empty(), "prompt must not be empty");
        assert!(
            prompt.len() <= LLM_PROMPT_BYTES_MAX,
            "prompt exceeds {LLM_PROMPT_BYTES_MAX} bytes"
        );
        Self::chat(vec![ChatMessage::user(prompt)])
    }

    /// Request continuing `messages`.
    ///
    /// # Panics
    /// Panics if `messages` is empty.
    #[must_use]
    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        assert!(!messages.is_empty(), "messages must not be empty");
        Self {
            system: None,
            messages,
            max_tokens: None,
            temperature: None,
            json_mode: false,
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Cap the output.
    ///
    /// # Panics
    /// Panics if `max_tokens` is zero.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        assert!(max_tokens > 0, "max_tokens must be positive");
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    ///
    /// # Panics
    /// Panics if `temperature` is outside `[0, 1]`.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&temperature),
            "temperature must be in [0.0, 1.0]"
        );
        self.temperature = Some(temperature);
        self
    }

    /// Ask for a JSON answer.
    #[must_use]
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Text of the newest user message.
    #[must_use]
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rfind(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    /// Bytes of system prompt and history together; checked against
    /// `LLM_PROMPT_BYTES_MAX` before sending.
    #[must_use]
    pub fn prompt_bytes(&self) -> usize {
        let history: usize = self.messages.iter().map(|m| m.content.len()).sum();
        history + self.system.as_deref().map_or(0, str::len)
    }
}

/// Reply fragments in arrival order; concatenated they form the reply.
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send + 'a>>;

/// A source of completions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Whole reply at once.
    ///
    /// # Errors
    /// Any [`ProviderError`].
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Reply as it is generated. An `Err` item ends the stream.
    ///
    /// Defaults to one fragment holding the `complete` result.
    fn complete_stream<'a>(&'a self, request: &'a CompletionRequest) -> TextStream<'a> {
        Box::pin(futures::stream::once(self.complete(request)))
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// `true` for providers that never leave the process.
    fn is_simulation(&self) -> bool;
}

#[async_trait]
impl<P: LLMProvider + ?Sized> LLMProvider for Arc<P> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        P::complete(self, request).await
    }

    fn complete_stream<'a>(&'a self, request: &'a CompletionRequest) -> TextStream<'a> {
        P::complete_stream(self, request)
    }

    fn name(&self) -> &'static str {
        P::name(self)
    }

    fn is_simulation(&self) -> bool {
        P::is_simulation(self)
    }
}
