//! Allocator / reservation engine.
//!
//! [`SeatReserver`] owns the seat state table for one venue. It finds and
//! holds the best available seats, confirms holds into reservations and
//! voids expired holds.
//!
//! The reserver is a plain `&mut self` state machine. Callers serialize
//! access with a single venue-wide lock (see [`crate::service`]).
//!
//! **Best seats**: lowest level id, then lowest row, then lowest seat
//! number. The allocator fills the best level in range completely before
//! spilling into the next one.

use box_office_core::{
    ConfirmationCode, HoldId, HoldIdSequence, LevelId, Result, Seat, SeatHold, SeatKey,
    SeatState, SeatStatus, TicketError, Venue,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Seat counts for a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAvailability {
    /// Level the counts belong to
    pub level: LevelId,
    /// Total seats on the level
    pub total: u32,
    /// Seats free for allocation
    pub available: u32,
    /// Seats held but not yet reserved
    pub held: u32,
    /// Seats reserved (confirmed)
    pub reserved: u32,
}

/// Seat allocation and reservation engine for a single venue.
#[derive(Debug)]
pub struct SeatReserver {
    venue: Arc<Venue>,
    seats: BTreeMap<SeatKey, (Seat, SeatState)>,
    hold_ids: HoldIdSequence,
    reservations: HashMap<ConfirmationCode, SeatHold>,
}

impl SeatReserver {
    /// Creates an engine with every seat of `venue` available.
    #[must_use]
    pub fn new(venue: Arc<Venue>) -> Self {
        let seats = venue
            .seats()
            .map(|seat| (seat.key(), (*seat, SeatState::new())))
            .collect();

        Self {
            venue,
            seats,
            hold_ids: HoldIdSequence::new(),
            reservations: HashMap::new(),
        }
    }

    /// The venue this engine allocates
    #[must_use]
    pub fn venue(&self) -> &Arc<Venue> {
        &self.venue
    }

    /// Number of available seats on `level`, or venue-wide when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidLevel`] if the venue has no such level.
    pub fn available_count(&self, level: Option<LevelId>) -> Result<u32> {
        debug!(level = ?level.map(LevelId::get), "available_count");

        match level {
            Some(level) => {
                if !self.venue.contains_level(level) {
                    return Err(TicketError::InvalidLevel(level));
                }
                Ok(count_u32(self.available_on(level).count()))
            },
            None => Ok(count_u32(
                self.seats.values().filter(|(_, state)| state.is_available()).count(),
            )),
        }
    }

    /// Per-level breakdown of available, held and reserved seats.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidLevel`] if the venue has no such level.
    pub fn availability(&self, level: LevelId) -> Result<LevelAvailability> {
        let info = self.venue.level(level).ok_or(TicketError::InvalidLevel(level))?;

        let mut counts = LevelAvailability {
            level,
            total: info.total_seats(),
            available: 0,
            held: 0,
            reserved: 0,
        };
        for (_, state) in self.level_range(level) {
            match state.status() {
                SeatStatus::Available => counts.available += 1,
                SeatStatus::Held(_) => counts.held += 1,
                SeatStatus::Reserved(_) => counts.reserved += 1,
            }
        }
        Ok(counts)
    }

    /// Current status of one seat, `None` if the seat is not in this venue
    #[must_use]
    pub fn seat_status(&self, key: &SeatKey) -> Option<SeatStatus> {
        self.seats.get(key).map(|(_, state)| state.status())
    }

    /// Finds the best `num_seats` available seats between `min_level` and
    /// `max_level` and holds them for `customer_email`.
    ///
    /// Unset bounds resolve to the venue's min/max level. Returns
    /// `Ok(None)` without touching any seat when the range holds fewer
    /// than `num_seats` available seats.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if `num_seats` is zero, the
    /// email is empty, a bound lies outside the venue's level range, or
    /// `min > max`.
    pub fn find_and_hold(
        &mut self,
        num_seats: u32,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
        customer_email: &str,
    ) -> Result<Option<SeatHold>> {
        debug!(num_seats, customer_email, "find_and_hold");

        if num_seats == 0 {
            return Err(TicketError::invalid_argument("number of seats must be greater than 0"));
        }
        if customer_email.is_empty() {
            return Err(TicketError::invalid_argument("customer email must not be empty"));
        }
        let (min, max) = self.resolve_bounds(min_level, max_level)?;
        if num_seats as usize > self.seats.len() {
            debug!(num_seats, venue_seats = self.seats.len(), "request exceeds venue capacity");
            return Ok(None);
        }

        let seats = self.find_best_seats(num_seats as usize, min, max);
        debug!(seats_found = seats.len(), "find_and_hold");
        if seats.len() < num_seats as usize {
            return Ok(None);
        }

        let hold = SeatHold::new(self.hold_ids.next_id(), customer_email, seats)?;
        for seat in hold.seats() {
            let (_, state) = self
                .seats
                .get_mut(&seat.key())
                .ok_or_else(|| TicketError::InvalidState(format!("{seat} does not exist")))?;
            state.hold(hold.id())?;
        }

        Ok(Some(hold))
    }

    /// Confirms every seat of `hold` into a reservation.
    ///
    /// All seats are validated before any is changed: on error the seat
    /// table is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidState`] if any seat is not currently
    /// held by this hold (expired, already reserved, held by another hold
    /// or not part of this venue).
    pub fn confirm(&mut self, hold: &SeatHold) -> Result<ConfirmationCode> {
        debug!(hold_id = %hold.id(), "confirm");

        self.verify_held_by(hold)?;
        for seat in hold.seats() {
            if let Some((_, state)) = self.seats.get_mut(&seat.key()) {
                state.reserve(hold.id())?;
            }
        }

        let code = ConfirmationCode::generate();
        self.reservations.insert(code, hold.clone());
        debug!(hold_id = %hold.id(), confirmation = %code, "confirm");
        Ok(code)
    }

    /// Releases every seat of an unconfirmed `hold` back to available.
    ///
    /// Expiring a hold that was already confirmed or already cleared is a
    /// programming error, not a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidState`] if any seat is not currently
    /// held (and unreserved) by this hold. Nothing is changed in that case.
    pub fn expire(&mut self, hold: &SeatHold) -> Result<()> {
        debug!(hold_id = %hold.id(), "expire");

        self.verify_held_by(hold)?;
        for seat in hold.seats() {
            if let Some((_, state)) = self.seats.get_mut(&seat.key()) {
                state.clear();
            }
        }
        Ok(())
    }

    /// Looks up a confirmed hold by its confirmation code
    #[must_use]
    pub fn reservation(&self, code: &ConfirmationCode) -> Option<&SeatHold> {
        self.reservations.get(code)
    }

    /// Number of confirmed holds
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Last hold id handed out
    #[must_use]
    pub fn last_hold_id(&self) -> Option<HoldId> {
        self.hold_ids.last_issued()
    }

    fn resolve_bounds(
        &self,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
    ) -> Result<(LevelId, LevelId)> {
        let venue_min = self.venue.min_level();
        let venue_max = self.venue.max_level();
        let min = min_level.unwrap_or(venue_min);
        let max = max_level.unwrap_or(venue_max);

        if !(venue_min..=venue_max).contains(&min) {
            return Err(TicketError::InvalidArgument(format!(
                "min level {min} must be between {venue_min} and {venue_max}"
            )));
        }
        if !(venue_min..=venue_max).contains(&max) {
            return Err(TicketError::InvalidArgument(format!(
                "max level {max} must be between {venue_min} and {venue_max}"
            )));
        }
        if min > max {
            return Err(TicketError::InvalidArgument(format!(
                "min level {min} must not be greater than max level {max}"
            )));
        }
        Ok((min, max))
    }

    /// Walks levels `min..=max` in ascending order, taking available seats in
    /// seat order until `wanted` are collected. Never allocates for more
    /// seats than the venue has.
    fn find_best_seats(&self, wanted: usize, min: LevelId, max: LevelId) -> Vec<Seat> {
        let mut seats = Vec::with_capacity(wanted.min(self.seats.len()));
        for level in self.venue.levels_between(min, max) {
            let remaining = wanted - seats.len();
            if remaining == 0 {
                break;
            }
            seats.extend(self.available_on(level.id()).take(remaining));
        }
        seats
    }

    fn verify_held_by(&self, hold: &SeatHold) -> Result<()> {
        for seat in hold.seats() {
            let Some((_, state)) = self.seats.get(&seat.key()) else {
                warn!(hold_id = %hold.id(), seat = %seat.key(), "seat does not exist in this venue");
                return Err(TicketError::InvalidState(format!("{seat} does not exist")));
            };
            if !state.is_held_by(hold.id()) {
                warn!(
                    hold_id = %hold.id(),
                    seat = %seat.key(),
                    status = ?state.status(),
                    "seat is not held by this hold"
                );
                return Err(TicketError::InvalidState(format!(
                    "{seat} is not held by hold {}",
                    hold.id()
                )));
            }
        }
        Ok(())
    }

    fn level_range(&self, level: LevelId) -> impl Iterator<Item = &(Seat, SeatState)> + '_ {
        self.seats
            .range(SeatKey::level_start(level)..=SeatKey::level_end(level))
            .map(|(_, entry)| entry)
    }

    fn available_on(&self, level: LevelId) -> impl Iterator<Item = Seat> + '_ {
        self.level_range(level)
            .filter(|(_, state)| state.is_available())
            .map(|(seat, _)| *seat)
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use box_office_core::{Level, Money};

    const EMAIL: &str = "a@x.com";

    fn venue(levels: &[(u32, u32, u32)]) -> Arc<Venue> {
        let levels = levels.iter().map(|&(id, rows, per_row)| {
            Level::new(LevelId::new(id), format!("Level {id}"), Money::from_cents(5_000), rows, per_row)
                .unwrap()
        });
        Arc::new(Venue::new(1, "Test", levels).unwrap())
    }

    fn keys(hold: &SeatHold) -> Vec<(u32, u32, u32)> {
        hold.seats()
            .iter()
            .map(|s| (s.level().get(), s.row(), s.number()))
            .collect()
    }

    #[test]
    fn test_fills_best_seats_in_row_order() {
        let mut reserver = SeatReserver::new(venue(&[(1, 2, 2)]));

        let hold = reserver.find_and_hold(3, None, None, EMAIL).unwrap().unwrap();
        assert_eq!(keys(&hold), vec![(1, 1, 1), (1, 1, 2), (1, 2, 1)]);
        assert_eq!(reserver.available_count(None).unwrap(), 1);
        assert_eq!(hold.customer_email(), EMAIL);
    }

    #[test]
    fn test_spills_into_next_level() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 1), (2, 1, 5)]));

        let hold = reserver.find_and_hold(3, None, None, EMAIL).unwrap().unwrap();
        assert_eq!(keys(&hold), vec![(1, 1, 1), (2, 1, 1), (2, 1, 2)]);
        assert_eq!(reserver.available_count(Some(LevelId::new(1))).unwrap(), 0);
        assert_eq!(reserver.available_count(Some(LevelId::new(2))).unwrap(), 3);
    }

    #[test]
    fn test_respects_level_bounds() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 2), (2, 1, 2), (3, 1, 2)]));

        let hold = reserver
            .find_and_hold(3, Some(LevelId::new(2)), Some(LevelId::new(3)), EMAIL)
            .unwrap()
            .unwrap();
        assert_eq!(keys(&hold), vec![(2, 1, 1), (2, 1, 2), (3, 1, 1)]);
        assert_eq!(reserver.available_count(Some(LevelId::new(1))).unwrap(), 2);
    }

    #[test]
    fn test_insufficient_seats_leaves_state_untouched() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 2), (2, 1, 2)]));

        let result = reserver
            .find_and_hold(3, Some(LevelId::new(2)), None, EMAIL)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(reserver.available_count(None).unwrap(), 4);
        assert_eq!(reserver.last_hold_id(), None);
    }

    #[test]
    fn test_request_larger_than_venue_returns_none() {
        let mut reserver = SeatReserver::new(venue(&[(1, 2, 3), (2, 1, 4)]));
        let _ = reserver.find_and_hold(2, None, None, EMAIL).unwrap().unwrap();
        let before: Vec<_> = reserver
            .venue()
            .seats()
            .map(|seat| reserver.seat_status(&seat.key()))
            .collect();

        let result = reserver.find_and_hold(u32::MAX, None, None, EMAIL).unwrap();
        assert!(result.is_none());
        assert!(reserver.find_and_hold(11, None, None, EMAIL).unwrap().is_none());

        let after: Vec<_> = reserver
            .venue()
            .seats()
            .map(|seat| reserver.seat_status(&seat.key()))
            .collect();
        assert_eq!(after, before);
        assert_eq!(reserver.available_count(None).unwrap(), 8);
        assert_eq!(reserver.last_hold_id(), Some(HoldId::new(1)));
    }

    #[test]
    fn test_rejects_invalid_arguments() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 2), (2, 1, 2)]));

        let invalid = |r: Result<Option<SeatHold>>| matches!(r, Err(TicketError::InvalidArgument(_)));
        assert!(invalid(reserver.find_and_hold(0, None, None, EMAIL)));
        assert!(invalid(reserver.find_and_hold(1, None, None, "")));
        assert!(invalid(reserver.find_and_hold(1, Some(LevelId::new(0)), None, EMAIL)));
        assert!(invalid(reserver.find_and_hold(1, None, Some(LevelId::new(3)), EMAIL)));
        assert!(invalid(reserver.find_and_hold(
            1,
            Some(LevelId::new(2)),
            Some(LevelId::new(1)),
            EMAIL
        )));
    }

    #[test]
    fn test_available_count_rejects_unknown_level() {
        let reserver = SeatReserver::new(venue(&[(1, 1, 2)]));
        assert_eq!(
            reserver.available_count(Some(LevelId::new(5))),
            Err(TicketError::InvalidLevel(LevelId::new(5)))
        );
    }

    #[test]
    fn test_hold_ids_increase() {
        let mut reserver = SeatReserver::new(venue(&[(1, 3, 3)]));
        let first = reserver.find_and_hold(1, None, None, EMAIL).unwrap().unwrap();
        let second = reserver.find_and_hold(1, None, None, EMAIL).unwrap().unwrap();
        assert!(first.id() < second.id());
        assert_ne!(first.seats()[0], second.seats()[0]);
    }

    #[test]
    fn test_confirm_reserves_every_seat() {
        let mut reserver = SeatReserver::new(venue(&[(1, 2, 2)]));
        let hold = reserver.find_and_hold(3, None, None, EMAIL).unwrap().unwrap();

        let code = reserver.confirm(&hold).unwrap();
        assert!(!code.to_string().is_empty());
        for seat in hold.seats() {
            assert_eq!(reserver.seat_status(&seat.key()), Some(SeatStatus::Reserved(hold.id())));
        }
        assert_eq!(reserver.reservation(&code), Some(&hold));
        assert_eq!(reserver.available_count(None).unwrap(), 1);

        assert!(matches!(reserver.confirm(&hold), Err(TicketError::InvalidState(_))));
        assert!(matches!(reserver.expire(&hold), Err(TicketError::InvalidState(_))));
        assert_eq!(reserver.reservation_count(), 1);
    }

    #[test]
    fn test_expire_releases_seats_for_reallocation() {
        let mut reserver = SeatReserver::new(venue(&[(1, 2, 2)]));
        let hold = reserver.find_and_hold(4, None, None, EMAIL).unwrap().unwrap();
        assert!(reserver.find_and_hold(1, None, None, EMAIL).unwrap().is_none());

        reserver.expire(&hold).unwrap();
        assert_eq!(reserver.available_count(None).unwrap(), 4);

        let again = reserver.find_and_hold(4, None, None, EMAIL).unwrap().unwrap();
        assert_eq!(keys(&again), keys(&hold));
        assert_ne!(again.id(), hold.id());

        // the stale hold no longer owns anything
        assert!(reserver.expire(&hold).is_err());
        assert!(reserver.confirm(&hold).is_err());
    }

    #[test]
    fn test_confirm_is_atomic() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 4)]));
        let hold = reserver.find_and_hold(2, None, None, EMAIL).unwrap().unwrap();

        // same id, but the second seat was never held by it
        let forged = SeatHold::new(
            hold.id(),
            EMAIL,
            vec![hold.seats()[0], reserver.venue().seats().nth(3).copied().unwrap()],
        )
        .unwrap();

        assert!(reserver.confirm(&forged).is_err());
        assert_eq!(
            reserver.seat_status(&hold.seats()[0].key()),
            Some(SeatStatus::Held(hold.id()))
        );
        assert!(reserver.confirm(&hold).is_ok());
    }

    #[test]
    fn test_foreign_seats_are_invalid_state() {
        let mut reserver = SeatReserver::new(venue(&[(1, 1, 1)]));
        let other_venue = venue(&[(1, 1, 1), (2, 1, 1)]);
        let foreign = SeatHold::new(
            HoldId::new(42),
            EMAIL,
            other_venue.level(LevelId::new(2)).unwrap().seats().to_vec(),
        )
        .unwrap();

        assert!(matches!(reserver.confirm(&foreign), Err(TicketError::InvalidState(_))));
        assert!(matches!(reserver.expire(&foreign), Err(TicketError::InvalidState(_))));
    }

    #[test]
    fn test_availability_breakdown() {
        let mut reserver = SeatReserver::new(venue(&[(1, 2, 3)]));
        let held = reserver.find_and_hold(2, None, None, EMAIL).unwrap().unwrap();
        let reserved = reserver.find_and_hold(3, None, None, EMAIL).unwrap().unwrap();
        reserver.confirm(&reserved).unwrap();

        let counts = reserver.availability(LevelId::new(1)).unwrap();
        assert_eq!(counts.total, 6);
        assert_eq!(counts.available, 1);
        assert_eq!(counts.held, held.seat_count() as u32);
        assert_eq!(counts.reserved, 3);
        assert!(reserver.availability(LevelId::new(2)).is_err());
    }
}
