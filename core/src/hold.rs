//! Seat holds and confirmation codes.

use crate::error::{Result, TicketError};
use crate::seating::{LevelId, Money, Seat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifier of a seat hold, unique and strictly increasing per engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldId(u64);

impl HoldId {
    /// Creates a `HoldId` from a raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic hold id generator owned by a single engine.
///
/// The first id handed out is `1`. Ids are never reused.
#[derive(Debug, Default)]
pub struct HoldIdSequence {
    last: AtomicU64,
}

impl HoldIdSequence {
    /// Creates a sequence whose first id is `1`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Hands out the next id
    pub fn next_id(&self) -> HoldId {
        HoldId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Last id handed out, `None` if none yet
    #[must_use]
    pub fn last_issued(&self) -> Option<HoldId> {
        match self.last.load(Ordering::Relaxed) {
            0 => None,
            last => Some(HoldId(last)),
        }
    }
}

/// An immutable claim on a concrete, ordered set of seats for one customer.
///
/// The seats may span several levels: the allocator fills the best level
/// first and spills into the next one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatHold {
    id: HoldId,
    customer_email: String,
    seats: Vec<Seat>,
}

impl SeatHold {
    /// Creates a new hold.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if the email or the seat
    /// list is empty.
    pub fn new(id: HoldId, customer_email: impl Into<String>, seats: Vec<Seat>) -> Result<Self> {
        let customer_email = customer_email.into();
        if customer_email.is_empty() {
            return Err(TicketError::invalid_argument("customer email must not be empty"));
        }
        if seats.is_empty() {
            return Err(TicketError::invalid_argument("a seat hold needs at least one seat"));
        }

        Ok(Self {
            id,
            customer_email,
            seats,
        })
    }

    /// Hold id
    #[must_use]
    pub const fn id(&self) -> HoldId {
        self.id
    }

    /// Email of the customer the seats are held for
    #[must_use]
    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    /// Held seats, in allocation order
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Number of held seats
    #[must_use]
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Distinct levels spanned by this hold, ascending
    #[must_use]
    pub fn levels(&self) -> Vec<LevelId> {
        let mut levels: Vec<_> = self.seats.iter().map(Seat::level).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    /// Sum of the seat prices, `None` on overflow
    #[must_use]
    pub fn total_price(&self) -> Option<Money> {
        self.seats
            .iter()
            .try_fold(Money::default(), |total, seat| total.checked_add(seat.price()))
    }
}

/// Opaque, globally unique code returned when a hold is confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationCode(Uuid);

impl ConfirmationCode {
    /// Generates a fresh random code
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn seat(level: u32, row: u32, number: u32, cents: u64) -> Seat {
        Seat::new(LevelId::new(level), row, number, Money::from_cents(cents)).unwrap()
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        let sequence = HoldIdSequence::new();
        assert_eq!(sequence.last_issued(), None);

        let ids: Vec<_> = (0..5).map(|_| sequence.next_id()).collect();
        assert_eq!(ids.first(), Some(&HoldId::new(1)));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(sequence.last_issued(), Some(HoldId::new(5)));
    }

    #[test]
    fn test_hold_validation() {
        let seats = vec![seat(1, 1, 1, 100)];
        assert!(SeatHold::new(HoldId::new(1), "", seats.clone()).is_err());
        assert!(SeatHold::new(HoldId::new(1), "a@x.com", Vec::new()).is_err());
        assert!(SeatHold::new(HoldId::new(1), "a@x.com", seats).is_ok());
    }

    #[test]
    fn test_hold_spanning_levels() {
        let hold = SeatHold::new(
            HoldId::new(9),
            "a@x.com",
            vec![seat(1, 1, 1, 10_000), seat(2, 1, 1, 7_500), seat(2, 1, 2, 7_500)],
        )
        .unwrap();

        assert_eq!(hold.seat_count(), 3);
        assert_eq!(hold.levels(), vec![LevelId::new(1), LevelId::new(2)]);
        assert_eq!(hold.total_price(), Some(Money::from_cents(25_000)));
    }

    #[test]
    fn test_confirmation_codes_are_unique() {
        let a = ConfirmationCode::generate();
        let b = ConfirmationCode::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }
}
