//! Storage - Document Backend Trait and Implementations
//!
//! `TigerStyle`: Abstract storage with simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │            DocumentBackend Trait           │
//! └───────────────────────────────────────────┘
//!          ↑                         ↑
//! ┌────────┴────────┐       ┌────────┴────────┐
//! │SimStorageBackend│       │   FileBackend   │
//! │   (testing)     │       │  (data dir)     │
//! └─────────────────┘       └─────────────────┘
//! ```

mod backend;
mod error;
mod file;
mod sim;

pub use backend::{validate_user_id, Document, DocumentBackend};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use sim::SimStorageBackend;
