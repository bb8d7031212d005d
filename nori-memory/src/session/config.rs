//! Session settings.

use crate::constants::{
    HISTORY_TURNS_COUNT_DEFAULT, HISTORY_TURNS_COUNT_MAX, LLM_EXTRACTION_TOKENS_MAX,
    LLM_REPLY_TOKENS_MAX,
};
use crate::dst::Clock;

/// Assistant turn shown to the model before the very first user message.
pub const GREETING_DEFAULT: &str = "Hi \u{2014} I'm your weight loss coach. I'll ask a few questions to build a plan tailored to you.\n\nHow much weight are you looking to lose?";

/// User turn that precedes the greeting in the priming exchange.
pub const PRIMING_MESSAGE_DEFAULT: &str = "hi";

/// Configuration for a [`Session`](super::Session).
///
/// # Example
///
/// ```rust
/// use nori_memory::session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_history_limit(10)
///     .with_greeting("Hello! What brings you here today?");
/// assert_eq!(config.history_limit, 10);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Trailing turns sent to the model.
    ///
    /// Default: 20
    pub history_limit: usize,

    /// Output budget for the reply.
    ///
    /// Default: 1024
    pub reply_max_tokens: usize,

    /// Output budget for the extraction call.
    ///
    /// Default: 500
    pub extraction_max_tokens: usize,

    /// Assistant half of the priming exchange.
    pub greeting: String,

    /// User half of the priming exchange.
    ///
    /// Default: "hi"
    pub priming_message: String,

    /// Source of timestamps and of `{current_date}`.
    ///
    /// Default: system clock
    pub clock: Clock,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_TURNS_COUNT_DEFAULT,
            reply_max_tokens: LLM_REPLY_TOKENS_MAX,
            extraction_max_tokens: LLM_EXTRACTION_TOKENS_MAX,
            greeting: GREETING_DEFAULT.to_string(),
            priming_message: PRIMING_MESSAGE_DEFAULT.to_string(),
            clock: Clock::System,
        }
    }
}

impl SessionConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many trailing turns are sent to the model.
    ///
    /// # Panics
    /// Panics if `limit` is zero or exceeds `HISTORY_TURNS_COUNT_MAX`.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        assert!(
            (1..=HISTORY_TURNS_COUNT_MAX).contains(&limit),
            "history_limit must be in 1..={HISTORY_TURNS_COUNT_MAX}, got {limit}"
        );
        self.history_limit = limit;
        self
    }

    /// Set the reply output budget.
    ///
    /// # Panics
    /// Panics if `tokens` is zero.
    #[must_use]
    pub fn with_reply_max_tokens(mut self, tokens: usize) -> Self {
        assert!(tokens > 0, "reply_max_tokens must be positive");
        self.reply_max_tokens = tokens;
        self
    }

    /// Set the extraction output budget.
    ///
    /// # Panics
    /// Panics if `tokens` is zero.
    #[must_use]
    pub fn with_extraction_max_tokens(mut self, tokens: usize) -> Self {
        assert!(tokens > 0, "extraction_max_tokens must be positive");
        self.extraction_max_tokens = tokens;
        self
    }

    /// Set the greeting used to prime a fresh conversation.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Use `clock` for timestamps and the prompt date.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}
