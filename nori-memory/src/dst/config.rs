//! `SimConfig` - which seed a simulated run uses.
//!
//! `DST_SEED` pins a run; otherwise a fresh seed is drawn and printed so a
//! failure can be replayed.

use std::env;

use rand::Rng;

use super::rng::DeterministicRng;

/// Environment variable that pins the seed.
pub const DST_SEED_ENV: &str = "DST_SEED";

/// Seed for one simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    seed: u64,
}

impl SimConfig {
    /// Use `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from `DST_SEED`, or a random one (printed to stderr).
    ///
    /// # Panics
    /// Panics if `DST_SEED` is set but is not a u64.
    #[must_use]
    pub fn from_env_or_random() -> Self {
        if let Some(seed) = seed_from_env() {
            return Self::with_seed(seed);
        }
        let seed = rand::thread_rng().gen::<u64>();
        eprintln!("DST: random seed {seed} (replay with {DST_SEED_ENV}={seed})");
        Self::with_seed(seed)
    }

    /// Configs for a seed sweep: only the pinned seed when `DST_SEED` is
    /// set, otherwise seeds `0..count`.
    ///
    /// ```
    /// use nori_memory::dst::SimConfig;
    ///
    /// if std::env::var("DST_SEED").is_err() {
    ///     let seeds: Vec<u64> = SimConfig::sweep(3).iter().map(SimConfig::seed).collect();
    ///     assert_eq!(seeds, vec![0, 1, 2]);
    /// }
    /// ```
    ///
    /// # Panics
    /// Panics if `DST_SEED` is set but is not a u64.
    #[must_use]
    pub fn sweep(count: u64) -> Vec<Self> {
        match seed_from_env() {
            Some(seed) => vec![Self::with_seed(seed)],
            None => (0..count).map(Self::with_seed).collect(),
        }
    }

    /// The seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fresh RNG at this seed.
    #[must_use]
    pub fn rng(&self) -> DeterministicRng {
        DeterministicRng::new(self.seed)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_env_or_random()
    }
}

fn seed_from_env() -> Option<u64> {
    let raw = env::var(DST_SEED_ENV).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(seed) => Some(seed),
        Err(_) => panic!("{DST_SEED_ENV} must be a valid u64, got: {raw}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_seed() {
        let config = SimConfig::with_seed(12345);
        assert_eq!(config.seed(), 12345);
        assert_eq!(config.rng().seed(), 12345);
    }

    #[test]
    fn test_sweep_is_pinned_or_ranged() {
        let sweep = SimConfig::sweep(4);
        if env::var(DST_SEED_ENV).is_ok() {
            assert_eq!(sweep.len(), 1);
        } else {
            assert_eq!(sweep, (0..4).map(SimConfig::with_seed).collect::<Vec<_>>());
        }
    }
}
