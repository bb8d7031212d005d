//! `SimClock` - Simulated Wall Clock
//!
//! `TigerStyle`: Deterministic, controllable local time for simulation.
//! Conversation timestamps and the date injected into the system prompt both
//! come from a [`Clock`], so tests can pin them.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::DST_TIME_ADVANCE_MS_MAX;

/// A simulated clock for deterministic testing.
///
/// Time only moves forward. Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct SimClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl SimClock {
    /// Create a clock starting at the given local date-time.
    #[must_use]
    pub fn at(start: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock starting at midnight of the given date.
    ///
    /// # Panics
    /// Panics if the date is not a valid calendar date.
    #[must_use]
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| panic!("invalid date {year}-{month}-{day}"));
        Self::at(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance time by the given number of milliseconds.
    ///
    /// # Panics
    /// Panics if `ms` exceeds `DST_TIME_ADVANCE_MS_MAX`.
    pub fn advance_ms(&self, ms: u64) -> NaiveDateTime {
        assert!(
            ms <= DST_TIME_ADVANCE_MS_MAX,
            "advance_ms({ms}) exceeds max ({DST_TIME_ADVANCE_MS_MAX})"
        );

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let before = *current;
        #[allow(clippy::cast_possible_wrap)]
        let step = Duration::milliseconds(ms as i64);
        *current = before + step;

        // Postcondition
        debug_assert!(*current >= before, "time must not go backwards");
        *current
    }
}

/// Source of "now" for a session.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// The host's local wall clock.
    #[default]
    System,
    /// A simulated clock under test control.
    Sim(SimClock),
}

impl Clock {
    /// Current local date-time.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Local::now().naive_local(),
            Self::Sim(clock) => clock.now(),
        }
    }

    /// Current local date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}
