//! # Box Office Core
//!
//! Core types for the Box Office ticketing engine.
//!
//! This crate describes a venue and the state of its seats. It contains no
//! locking and no timers; those live in `box-office-runtime`.
//!
//! ## Core Concepts
//!
//! - **Venue / Level / Seat**: immutable seating layout, levels priced flat
//!   per ticket and ordered from best (lowest id) to worst
//! - **`SeatState`**: per-seat state machine (available → held → reserved)
//! - **`SeatHold`**: a temporary, time-limited claim on concrete seats
//! - **`ConfirmationCode`**: the opaque result of confirming a hold
//! - **`TicketService`**: the public operations offered to callers
//!
//! ## Example
//!
//! ```
//! use box_office_core::seating::{Level, LevelId, Money, Venue};
//!
//! # fn main() -> box_office_core::Result<()> {
//! let venue = Venue::new(1, "Hall", vec![
//!     Level::new(LevelId::new(1), "Orchestra", Money::from_cents(10_000), 25, 50)?,
//!     Level::new(LevelId::new(2), "Main", Money::from_cents(7_500), 20, 100)?,
//! ])?;
//!
//! assert_eq!(venue.min_level(), LevelId::new(1));
//! assert_eq!(venue.total_seats(), 3_250);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Error taxonomy
pub mod error;

/// Seat holds, hold ids and confirmation codes
pub mod hold;

/// Per-seat state machine
pub mod seat_state;

/// Static seating model
pub mod seating;

pub use error::{Result, TicketError};
pub use hold::{ConfirmationCode, HoldId, HoldIdSequence, SeatHold};
pub use seat_state::{SeatState, SeatStatus};
pub use seating::{Level, LevelId, Money, Seat, SeatKey, Venue};

/// Environment module - injected dependencies
///
/// Everything the engine needs from the outside world is abstracted behind
/// a trait here so tests can substitute deterministic implementations.
pub mod environment {
    use crate::hold::SeatHold;
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use box_office_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Notified with the hold when an unconfirmed hold expires.
    ///
    /// This is the only externally observable side effect of expiration.
    /// A UI uses it to release whatever it tied to those seats.
    ///
    /// Called after the engine lock has been released, from the timer's
    /// task. Implementations must not block.
    pub trait HoldExpiryListener: Send + Sync {
        /// A hold expired and its seats are available again
        fn on_hold_expired(&self, hold: &SeatHold);
    }

    impl<F> HoldExpiryListener for F
    where
        F: Fn(&SeatHold) + Send + Sync,
    {
        fn on_hold_expired(&self, hold: &SeatHold) {
            self(hold);
        }
    }
}

/// Service module - the operations exposed to external callers
pub mod service {
    use crate::error::Result;
    use crate::hold::{ConfirmationCode, HoldId, SeatHold};
    use crate::seating::LevelId;
    use futures::future::BoxFuture;

    /// Public ticketing operations.
    ///
    /// Every call is fully serialized by the implementation. Returns
    /// `BoxFuture` instead of async fn to stay dyn-compatible.
    pub trait TicketService: Send + Sync {
        /// Number of seats currently available, in one level or venue-wide.
        ///
        /// # Errors
        ///
        /// Returns [`crate::TicketError::InvalidLevel`] if `level` is given
        /// and the venue does not contain it.
        fn num_seats_available(&self, level: Option<LevelId>) -> BoxFuture<'_, Result<u32>>;

        /// Finds and holds the best `num_seats` available seats between
        /// `min_level` and `max_level` (venue bounds when `None`).
        ///
        /// Returns `Ok(None)` when the range cannot supply every requested
        /// seat; partial holds are never made.
        ///
        /// # Errors
        ///
        /// Returns [`crate::TicketError::InvalidArgument`] for a zero seat
        /// count, an empty email or invalid level bounds.
        fn find_and_hold_seats<'a>(
            &'a self,
            num_seats: u32,
            min_level: Option<LevelId>,
            max_level: Option<LevelId>,
            customer_email: &'a str,
        ) -> BoxFuture<'a, Result<Option<SeatHold>>>;

        /// Confirms a pending hold made for `customer_email`.
        ///
        /// # Errors
        ///
        /// - [`crate::TicketError::HoldNotFound`] if the hold expired or was
        ///   already reserved
        /// - [`crate::TicketError::PermissionDenied`] on an email mismatch
        fn reserve_seats<'a>(
            &'a self,
            hold_id: HoldId,
            customer_email: &'a str,
        ) -> BoxFuture<'a, Result<ConfirmationCode>>;
    }
}
