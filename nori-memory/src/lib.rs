//! # Nori Memory
//!
//! Conversation memory and a learned user profile for a coaching assistant,
//! with deterministic simulation testing.
//!
//! ## Features
//!
//! - **Conversation log**: append-only per-user turn log, bounded history window for the model
//! - **Learned profile**: schema-driven user profile, updated after every reply by an extraction call
//! - **Graceful degradation**: a failed or malformed extraction never fails the reply
//! - **Deterministic testing**: simulated LLM and storage with seeded fault injection
//! - **Atomic persistence**: one JSON document per user and kind, replaced by rename
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use nori_memory::dst::SimConfig;
//! use nori_memory::llm::SimLLMProvider;
//! use nori_memory::profile::ProfileSchema;
//! use nori_memory::session::{Session, SessionConfig};
//! use nori_memory::storage::SimStorageBackend;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Scripted replies: the coaching answer, then the extraction result
//! let provider = SimLLMProvider::with_seed(42).with_responses([
//!     "Great goal! What's your current weight?",
//!     r#"{"notes": ["wants to lose 20 lbs"]}"#,
//! ]);
//! let storage = Arc::new(SimStorageBackend::new(SimConfig::with_seed(42)));
//! let session = Session::new(provider, storage, ProfileSchema::weight_loss(), SessionConfig::default());
//!
//! let exchange = session.chat("u1", "I want to lose 20 lbs").await?;
//! println!("{}", exchange.reply);
//!
//! let profile = session.profiles().load("u1").await?;
//! assert_eq!(profile.list("notes"), vec!["wants to lose 20 lbs"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         Session                          │
//! ├─────────────────────────────────────────────────────────┤
//! │  ConversationStore │ ProfileStore │ ProfileExtractor     │
//! ├─────────────────────────────────────────────────────────┤
//! │  PromptTemplate           │ system prompt + resources   │
//! │  LLMProvider              │ Anthropic or simulation     │
//! │  DocumentBackend          │ files or simulation         │
//! ├─────────────────────────────────────────────────────────┤
//! │  DST Framework            │ Fault injection + sim clock │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `anthropic` - Anthropic LLM provider (Claude), including SSE streaming

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod conversation;
pub mod dst;
pub mod extraction;
pub mod llm;
pub mod profile;
pub mod session;
pub mod storage;
pub mod template;

// Re-export common types
pub use constants::*;
pub use dst::{Clock, DeterministicRng, FaultConfig, FaultInjector, FaultType, SimClock, SimConfig};

// Storage exports
pub use storage::{Document, DocumentBackend, FileBackend, SimStorageBackend, StorageError};

// LLM Provider exports
pub use llm::{ChatMessage, CompletionRequest, LLMProvider, ProviderError, Role, SimLLMProvider};

#[cfg(feature = "anthropic")]
pub use llm::AnthropicProvider;

// Memory exports
pub use conversation::{ConversationStore, Turn};
pub use extraction::{ExtractionError, ProfileExtractor, ProfileUpdate};
pub use profile::{Profile, ProfileSchema, ProfileStore};
pub use template::{PromptTemplate, TemplateError};

// Session exports (main API)
pub use session::{Exchange, ExtractionOutcome, Session, SessionConfig, SessionError};
