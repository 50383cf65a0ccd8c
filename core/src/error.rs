//! Error taxonomy for the ticketing engine.
//!
//! Every error is synchronous and surfaced to the immediate caller. Nothing
//! here is retried automatically.
//!
//! Note that "not enough seats" is *not* an error: `find_and_hold` returns
//! `Ok(None)` in that case.

use crate::hold::HoldId;
use crate::seating::LevelId;
use thiserror::Error;

/// Errors returned by the seating model, the engine and the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// Malformed input: zero seat counts, empty email, out-of-range or
    /// inverted level bounds, invalid venue layout values.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A specific level was requested that the venue does not contain.
    #[error("Venue does not contain level {0}")]
    InvalidLevel(LevelId),

    /// Two levels with the same id were supplied when building a venue.
    #[error("Duplicate level id {0}")]
    DuplicateLevel(LevelId),

    /// Protocol violation on the seat state machine.
    ///
    /// Reserving an unheld seat, reserving with a mismatched hold id,
    /// expiring a hold whose seats are not held by it, or touching seats
    /// the engine does not know about.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The hold is no longer tracked (already expired, already reserved,
    /// or never issued).
    #[error("Seat hold {0} not found or expired")]
    HoldNotFound(HoldId),

    /// The caller's email does not match the email the hold was made for.
    #[error("Customer email does not match seat hold {0}")]
    PermissionDenied(HoldId),

    /// The service has been shut down and accepts no new holds.
    #[error("Ticket service is shutting down")]
    ShuttingDown,
}

impl TicketError {
    /// Shorthand for [`TicketError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`TicketError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TicketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TicketError::invalid_argument("numSeats must be greater than 0").to_string(),
            "Invalid argument: numSeats must be greater than 0"
        );
        assert_eq!(
            TicketError::InvalidLevel(LevelId::new(7)).to_string(),
            "Venue does not contain level 7"
        );
        assert_eq!(
            TicketError::HoldNotFound(HoldId::new(3)).to_string(),
            "Seat hold 3 not found or expired"
        );
    }
}
