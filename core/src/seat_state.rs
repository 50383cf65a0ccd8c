//! Per-seat mutable state.
//!
//! ```text
//!   Available ──hold(id)──► Held(id) ──reserve(id)──► Reserved(id)
//!       ▲                      │
//!       └───────clear()────────┘
//! ```
//!
//! There is no transition from `Reserved` back to `Available` in the
//! engine; expiration only applies to held seats. `clear()` itself is
//! unconditional, so callers must check the status first.

use crate::error::{Result, TicketError};
use crate::hold::HoldId;
use serde::{Deserialize, Serialize};

/// Where a seat sits in its lifecycle.
///
/// A reserved seat is always also held by the same hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatStatus {
    /// Free for allocation
    #[default]
    Available,
    /// Temporarily claimed by a hold
    Held(HoldId),
    /// Confirmed by the hold that claimed it
    Reserved(HoldId),
}

/// Mutable state of a single seat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatState {
    status: SeatStatus,
}

impl SeatState {
    /// A fresh, available seat
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: SeatStatus::Available,
        }
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> SeatStatus {
        self.status
    }

    /// True for held *and* reserved seats.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        !matches!(self.status, SeatStatus::Available)
    }

    /// True once the holding hold has been confirmed
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self.status, SeatStatus::Reserved(_))
    }

    /// True when neither held nor reserved
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, SeatStatus::Available)
    }

    /// Id of the hold that owns this seat, if any
    #[must_use]
    pub const fn holding_id(&self) -> Option<HoldId> {
        match self.status {
            SeatStatus::Available => None,
            SeatStatus::Held(id) | SeatStatus::Reserved(id) => Some(id),
        }
    }

    /// Whether the seat is held (not yet reserved) by exactly `id`
    #[must_use]
    pub fn is_held_by(&self, id: HoldId) -> bool {
        self.status == SeatStatus::Held(id)
    }

    /// Claims an available seat for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidState`] if the seat is already held.
    pub fn hold(&mut self, id: HoldId) -> Result<()> {
        if self.is_held() {
            return Err(TicketError::invalid_state("seat must not already be held"));
        }
        self.status = SeatStatus::Held(id);
        Ok(())
    }

    /// Confirms a seat held by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidState`] if the seat is not held, is
    /// already reserved, or is held by a different hold.
    pub fn reserve(&mut self, id: HoldId) -> Result<()> {
        match self.status {
            SeatStatus::Available => Err(TicketError::invalid_state("seat must already be held")),
            SeatStatus::Reserved(_) => {
                Err(TicketError::invalid_state("seat must not already be reserved"))
            },
            SeatStatus::Held(current) if current != id => Err(TicketError::InvalidState(format!(
                "seat is held by hold {current}, not {id}"
            ))),
            SeatStatus::Held(_) => {
                self.status = SeatStatus::Reserved(id);
                Ok(())
            },
        }
    }

    /// Resets the seat to available, whatever its current status.
    pub fn clear(&mut self) {
        self.status = SeatStatus::Available;
    }
}
