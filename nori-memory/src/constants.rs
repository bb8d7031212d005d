//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `HISTORY_TURNS_COUNT_DEFAULT` (not `DEFAULT_HISTORY_TURNS`)
//!
//! Every constant includes units in the name:
//! - _`BYTES_MAX` for size limits
//! - _`COUNT_MAX/DEFAULT` for quantity limits
//! - _`TOKENS_MAX` for model output budgets

// =============================================================================
// Conversation Limits
// =============================================================================

/// Number of trailing turns fed back to the model by default
pub const HISTORY_TURNS_COUNT_DEFAULT: usize = 20;

/// Upper bound for a configured history window
pub const HISTORY_TURNS_COUNT_MAX: usize = 1_000;

/// Maximum size of a single user message
pub const MESSAGE_BYTES_MAX: usize = 32 * 1024; // 32KB

// =============================================================================
// Document Limits
// =============================================================================

/// Maximum size of a persisted profile. The conversation log is uncapped.
pub const PROFILE_BYTES_MAX: usize = 1024 * 1024; // 1MB

/// Maximum length of a user id (one path component)
pub const USER_ID_BYTES_MAX: usize = 128;

// =============================================================================
// Profile Limits
// =============================================================================

/// Maximum number of fields in a profile schema
pub const PROFILE_FIELDS_COUNT_MAX: usize = 64;

/// Line emitted when no profile field is populated
pub const PROFILE_EMPTY_SENTINEL: &str = "No information known yet about this person.";

/// Literal the extraction model returns when nothing new was learned
pub const EXTRACTION_NULL_SENTINEL: &str = "null";

// =============================================================================
// LLM Limits
// =============================================================================

/// Maximum prompt size
pub const LLM_PROMPT_BYTES_MAX: usize = 512 * 1024; // 512KB

/// Maximum response size
pub const LLM_RESPONSE_BYTES_MAX: usize = 256 * 1024; // 256KB

/// Output budget for the user-visible reply
pub const LLM_REPLY_TOKENS_MAX: usize = 1024;

/// Output budget for the profile extraction pass
pub const LLM_EXTRACTION_TOKENS_MAX: usize = 500;

// =============================================================================
// DST Limits
// =============================================================================

/// Maximum fault probability
pub const DST_FAULT_PROBABILITY_MAX: f64 = 1.0;

/// Maximum single time advance for the simulated clock
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 30 * TIME_MS_PER_DAY; // 30 days

// =============================================================================
// Time Constants
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1000;

/// Milliseconds per day
pub const TIME_MS_PER_DAY: u64 = 24 * 60 * 60 * TIME_MS_PER_SEC;

// =============================================================================
// Tests
// =============================================================================
