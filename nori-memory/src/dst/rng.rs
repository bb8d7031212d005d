//! Seeded randomness for simulated providers and stores.
//!
//! Everything random in a simulated coaching session (canned replies, fault
//! rolls) draws from a [`DeterministicRng`], so one seed replays a session
//! exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Golden-ratio increment between child seeds.
const FORK_SEED_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

/// ChaCha20 stream tagged with the seed it started from.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    inner: ChaCha20Rng,
    seed: u64,
    children_count: u64,
}

impl DeterministicRng {
    /// Start a stream at `seed`.
    ///
    /// ```
    /// use nori_memory::dst::DeterministicRng;
    ///
    /// let mut a = DeterministicRng::new(42);
    /// let mut b = DeterministicRng::new(42);
    /// assert_eq!(a.next_bool(0.5), b.next_bool(0.5));
    /// ```
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha20Rng::seed_from_u64(seed),
            seed,
            children_count: 0,
        }
    }

    /// Seed this stream started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// `true` with `probability`.
    ///
    /// # Panics
    /// Panics if `probability` is outside `[0, 1]`.
    pub fn next_bool(&mut self, probability: f64) -> bool {
        assert!(
            (0.0..=1.0).contains(&probability),
            "probability must be in [0, 1], got {probability}"
        );
        self.next_float() < probability
    }

    /// Uniformly pick one element.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "cannot choose from empty slice");
        &items[self.inner.gen_range(0..items.len())]
    }

    /// Derive an independent stream, e.g. one per simulated component.
    ///
    /// Children depend only on this stream's seed and how many children were
    /// taken before, never on how much of this stream was consumed.
    pub fn fork(&mut self) -> Self {
        self.children_count += 1;
        Self::new(
            self.seed
                .wrapping_add(self.children_count.wrapping_mul(FORK_SEED_STEP)),
        )
    }
}
