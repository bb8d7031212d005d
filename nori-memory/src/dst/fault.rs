//! Probabilistic fault injection for the simulated provider and store.
//!
//! Operations are named `<domain>_<verb>[:<detail>]`, for example
//! `llm_complete`, `llm_stream` or `storage_write:profile`. Each fault
//! belongs to one domain and is only rolled for operations in it.

use std::sync::{Mutex, PoisonError};

use super::rng::DeterministicRng;
use crate::constants::DST_FAULT_PROBABILITY_MAX;

/// Which family of operations a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDomain {
    /// Document reads and writes
    Storage,
    /// Completion requests
    Llm,
}

impl FaultDomain {
    fn matches(self, operation: &str) -> bool {
        let prefix = match self {
            Self::Storage => "storage_",
            Self::Llm => "llm_",
        };
        operation.starts_with(prefix)
    }
}

/// A failure the simulation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    /// Document write fails
    StorageWriteFail,
    /// Document read fails
    StorageReadFail,
    /// Document bytes come back garbled
    StorageCorruption,
    /// Completion request times out
    LlmTimeout,
    /// Provider rate-limits the request
    LlmRateLimit,
    /// Provider answers 5xx
    LlmServiceUnavailable,
    /// Model answers with text that is not the requested format
    LlmInvalidResponse,
    /// Stream breaks after the first fragment
    LlmStreamInterrupt,
}

impl FaultType {
    /// Domain this fault is rolled in.
    #[must_use]
    pub fn domain(self) -> FaultDomain {
        match self {
            Self::StorageWriteFail | Self::StorageReadFail | Self::StorageCorruption => {
                FaultDomain::Storage
            }
            Self::LlmTimeout
            | Self::LlmRateLimit
            | Self::LlmServiceUnavailable
            | Self::LlmInvalidResponse
            | Self::LlmStreamInterrupt => FaultDomain::Llm,
        }
    }
}

/// One fault, how likely it is, and where it may fire.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// What fails
    pub fault_type: FaultType,
    /// Chance per matching operation, in `[0, 1]`
    pub probability: f64,
    /// Only roll for operations containing this substring
    pub operation_filter: Option<String>,
    /// Stop firing after this many injections
    pub max_injections: Option<u64>,
}

impl FaultConfig {
    /// Fault firing with `probability` on every operation in its domain.
    ///
    /// # Panics
    /// Panics if probability is not in [0, 1].
    #[must_use]
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        assert!(
            (0.0..=DST_FAULT_PROBABILITY_MAX).contains(&probability),
            "probability must be in [0, {DST_FAULT_PROBABILITY_MAX}], got {probability}"
        );
        Self {
            fault_type,
            probability,
            operation_filter: None,
            max_injections: None,
        }
    }

    /// Restrict to operations containing `filter`, e.g. `"profile"` or
    /// `"llm_complete"`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.operation_filter = Some(filter.into());
        self
    }

    /// Fire at most `max` times.
    ///
    /// # Panics
    /// Panics if `max` is zero.
    #[must_use]
    pub fn with_max_injections(mut self, max: u64) -> Self {
        assert!(max > 0, "max_injections must be positive");
        self.max_injections = Some(max);
        self
    }

    fn applies_to(&self, operation: &str) -> bool {
        self.fault_type.domain().matches(operation)
            && self
                .operation_filter
                .as_deref()
                .map_or(true, |filter| operation.contains(filter))
    }
}

#[derive(Debug)]
struct Rolls {
    rng: DeterministicRng,
    // Parallel to `FaultInjector::configs`.
    fired: Vec<u64>,
}

/// Rolls registered faults against named operations.
///
/// Shared through `Arc` by the simulated provider and storage backend; all
/// mutable state sits behind one lock so the roll order is the call order.
#[derive(Debug)]
pub struct FaultInjector {
    configs: Vec<FaultConfig>,
    rolls: Mutex<Rolls>,
}

impl FaultInjector {
    /// Injector with nothing registered.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            configs: Vec::new(),
            rolls: Mutex::new(Rolls {
                rng,
                fired: Vec::new(),
            }),
        }
    }

    /// Add a fault. Registration happens before the injector is shared.
    pub fn register(&mut self, config: FaultConfig) {
        self.configs.push(config);
        self.rolls
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .fired
            .push(0);
    }

    /// First registered fault that fires for `operation`, if any.
    ///
    /// Faults are rolled in registration order; the RNG advances only for
    /// faults that apply and still have injections left.
    pub fn should_inject(&self, operation: &str) -> Option<FaultType> {
        let mut rolls = self.rolls.lock().unwrap_or_else(PoisonError::into_inner);
        let Rolls { rng, fired } = &mut *rolls;

        for (config, count) in self.configs.iter().zip(fired.iter_mut()) {
            if !config.applies_to(operation) {
                continue;
            }
            if config.max_injections.is_some_and(|max| *count >= max) {
                continue;
            }
            if rng.next_bool(config.probability) {
                *count += 1;
                return Some(config.fault_type);
            }
        }
        None
    }

    /// How many times `fault_type` has fired.
    #[must_use]
    pub fn injected(&self, fault_type: FaultType) -> u64 {
        let rolls = self.rolls.lock().unwrap_or_else(PoisonError::into_inner);
        self.configs
            .iter()
            .zip(&rolls.fired)
            .filter(|(config, _)| config.fault_type == fault_type)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Injections across all faults.
    #[must_use]
    pub fn total_injections(&self) -> u64 {
        self.rolls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fired
            .iter()
            .sum()
    }
}

/// Builds a [`FaultInjector`] before it is put behind an `Arc`.
pub struct FaultInjectorBuilder {
    injector: FaultInjector,
}

impl FaultInjectorBuilder {
    /// Builder drawing rolls from `rng`.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            injector: FaultInjector::new(rng),
        }
    }

    /// Add a fault.
    #[must_use]
    pub fn with_fault(mut self, config: FaultConfig) -> Self {
        self.injector.register(config);
        self
    }

    /// Add timeouts and rate limits on every completion request.
    #[must_use]
    pub fn with_llm_faults(self, probability: f64) -> Self {
        self.with_fault(FaultConfig::new(FaultType::LlmTimeout, probability))
            .with_fault(FaultConfig::new(FaultType::LlmRateLimit, probability))
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> FaultInjector {
        self.injector
    }
}
