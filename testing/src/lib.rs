//! # Museum Tickets Testing
//!
//! Helpers for testing the booking reducers without a runtime.
//!
//! - [`FixedClock`] pins "today" so date validation is reproducible
//! - [`ReducerTest`] drives a reducer with Given-When-Then syntax
//! - [`assertions`] checks the shape of returned effects
//!
//! ## Example
//!
//! ```ignore
//! use museum_tickets_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(SessionReducer::new())
//!     .with_env(test_environment(test_clock()))
//!     .given_state(SessionState::default())
//!     .when_action(SessionAction::StartBooking)
//!     .then_state(|state| assert_eq!(state.step, SessionStep::DateSelection))
//!     .run();
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use museum_tickets_core::environment::Clock;

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, NaiveDate, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use museum_tickets_testing::mocks::FixedClock;
    /// use museum_tickets_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a clock pinned to midnight UTC of `date`
        #[must_use]
        pub fn on(date: NaiveDate) -> Self {
            Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests: 2025-06-01 09:00:00 UTC
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{FixedClock, test_clock};
