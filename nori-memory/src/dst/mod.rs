//! DST - Deterministic Simulation Testing
//!
//! Seeded randomness, a controllable clock and probabilistic fault injection.
//! The simulated LLM provider and storage backend draw on these so that a
//! whole coaching session replays exactly from one seed.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use nori_memory::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, FaultType, SimConfig};
//!
//! let config = SimConfig::with_seed(42);
//! let faults = Arc::new(
//!     FaultInjectorBuilder::new(DeterministicRng::new(config.seed()))
//!         .with_fault(FaultConfig::new(FaultType::StorageWriteFail, 1.0))
//!         .build(),
//! );
//! assert!(faults.should_inject("storage_write").is_some());
//! ```
//!
//! Run with explicit seed for reproducibility:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

mod clock;
mod config;
mod fault;
mod rng;

pub use clock::{Clock, SimClock};
pub use config::SimConfig;
pub use fault::{FaultConfig, FaultDomain, FaultInjector, FaultInjectorBuilder, FaultType};
pub use rng::DeterministicRng;
