//! # Box Office Testing
//!
//! Testing utilities and helpers for the Box Office ticketing engine.
//!
//! This crate provides:
//! - Mock implementations of the environment traits
//! - Venue fixtures shared across the test suites
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use box_office_testing::{RecordingExpiryListener, fixtures};
//!
//! let venue = fixtures::small_venue();
//! assert_eq!(venue.total_seats(), 4);
//!
//! let listener = RecordingExpiryListener::new();
//! assert_eq!(listener.count(), 0);
//! ```

use box_office_core::environment::{Clock, HoldExpiryListener};
use box_office_core::{HoldId, SeatHold};
use chrono::{DateTime, Utc};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, HoldExpiryListener, HoldId, SeatHold, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making hold deadlines reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use box_office_testing::mocks::FixedClock;
    /// use box_office_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Expiry listener that remembers every hold it was notified about.
    ///
    /// Clones share the same record, so keep one clone for assertions and
    /// hand the other to the service builder.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingExpiryListener {
        expired: Arc<Mutex<Vec<SeatHold>>>,
    }

    impl RecordingExpiryListener {
        /// Create an empty listener
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Holds notified so far, in notification order
        #[must_use]
        pub fn expired(&self) -> Vec<SeatHold> {
            self.expired.lock().map(|holds| holds.clone()).unwrap_or_default()
        }

        /// Ids of the holds notified so far
        #[must_use]
        pub fn expired_ids(&self) -> Vec<HoldId> {
            self.expired().iter().map(SeatHold::id).collect()
        }

        /// Number of notifications received
        #[must_use]
        pub fn count(&self) -> usize {
            self.expired.lock().map(|holds| holds.len()).unwrap_or_default()
        }
    }

    impl HoldExpiryListener for RecordingExpiryListener {
        fn on_hold_expired(&self, hold: &SeatHold) {
            if let Ok(mut holds) = self.expired.lock() {
                holds.push(hold.clone());
            }
        }
    }
}

/// Venues used across the test suites.
///
/// Fixture data is hardcoded and valid, so construction failures panic.
#[allow(clippy::expect_used)]
pub mod fixtures {
    use box_office_core::{Level, LevelId, Money, Venue};
    use std::sync::Arc;

    /// Email used by tests that do not care about the customer
    pub const TEST_EMAIL: &str = "test@email.com";

    /// Builds a venue from `(rows, seats_per_row)` pairs with level ids
    /// `1..=n` and a $50.00 flat price.
    ///
    /// # Panics
    ///
    /// Panics if `layout` is empty or contains a zero dimension.
    #[must_use]
    pub fn venue_from_layout(layout: &[(u32, u32)]) -> Arc<Venue> {
        let levels = (1_u32..).zip(layout).map(|(id, &(rows, per_row))| {
            Level::new(LevelId::new(id), format!("Level {id}"), Money::from_cents(5_000), rows, per_row)
                .expect("fixture level is valid")
        });
        Arc::new(Venue::new(1, "Test Venue", levels).expect("fixture venue is valid"))
    }

    /// One level, 2 rows of 2 seats
    #[must_use]
    pub fn small_venue() -> Arc<Venue> {
        venue_from_layout(&[(2, 2)])
    }

    /// Level 1 with a single seat, level 2 with one row of 5 seats
    #[must_use]
    pub fn split_venue() -> Arc<Venue> {
        venue_from_layout(&[(1, 1), (1, 5)])
    }

    /// The four-level reference hall from [`Venue::grand_hall`]: 6,250 seats.
    ///
    /// | Level | Name      | Price   | Rows | Seats per row |
    /// |-------|-----------|---------|------|---------------|
    /// | 1     | Orchestra | $100.00 | 25   | 50            |
    /// | 2     | Main      | $75.00  | 20   | 100           |
    /// | 3     | Balcony 1 | $50.00  | 15   | 100           |
    /// | 4     | Balcony 2 | $4.00   | 15   | 100           |
    #[must_use]
    pub fn standard_venue() -> Arc<Venue> {
        Arc::new(Venue::grand_hall().expect("reference venue is valid"))
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use box_office_core::{LevelId, Venue};
    use proptest::prelude::*;
    use std::sync::Arc;

    /// `(rows, seats_per_row)` for 1 to 4 levels of up to 4x5 seats
    pub fn venue_layout() -> impl Strategy<Value = Vec<(u32, u32)>> {
        prop::collection::vec((1_u32..=4, 1_u32..=5), 1..=4)
    }

    /// A small venue with levels `1..=n`
    pub fn arb_venue() -> impl Strategy<Value = Arc<Venue>> {
        venue_layout().prop_map(|layout| crate::fixtures::venue_from_layout(&layout))
    }

    /// A well-formed `find_and_hold` request against a venue with levels
    /// `1..=levels`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HoldRequest {
        /// Seats wanted, at least one
        pub num_seats: u32,
        /// Lower level bound, `None` for the venue minimum
        pub min_level: Option<LevelId>,
        /// Upper level bound, `None` for the venue maximum
        pub max_level: Option<LevelId>,
    }

    /// Requests with valid bounds (`min <= max`, both inside the venue).
    pub fn hold_request(levels: u32, max_seats: u32) -> impl Strategy<Value = HoldRequest> {
        let levels = levels.max(1);
        (
            1..=max_seats.max(1),
            1..=levels,
            1..=levels,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(num_seats, a, b, bound_min, bound_max)| HoldRequest {
                num_seats,
                min_level: bound_min.then(|| LevelId::new(a.min(b))),
                max_level: bound_max.then(|| LevelId::new(a.max(b))),
            })
    }
}

// Re-export commonly used items
pub use fixtures::TEST_EMAIL;
pub use mocks::{FixedClock, RecordingExpiryListener, test_clock};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use box_office_core::{LevelId, Money, Seat};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_standard_venue_dimensions() {
        let venue = fixtures::standard_venue();
        assert_eq!(venue.total_seats(), 6_250);
        assert_eq!(venue.min_level(), LevelId::new(1));
        assert_eq!(venue.max_level(), LevelId::new(4));
        assert_eq!(venue.level(LevelId::new(2)).unwrap().name(), "Main");
    }

    #[test]
    fn test_recording_listener_shares_record_between_clones() {
        let listener = RecordingExpiryListener::new();
        let handed_out = listener.clone();

        let seat = Seat::new(LevelId::new(1), 1, 1, Money::from_cents(100)).unwrap();
        let hold = SeatHold::new(HoldId::new(3), TEST_EMAIL, vec![seat]).unwrap();
        handed_out.on_hold_expired(&hold);

        assert_eq!(listener.count(), 1);
        assert_eq!(listener.expired_ids(), vec![HoldId::new(3)]);
    }
}
