//! Static seating model: seats, priced levels and the venue that owns them.
//!
//! Everything in this module is immutable once constructed. Mutable seat
//! state lives in [`crate::seat_state`] and is owned by the engine.
//!
//! Ordering of seats is the "best seat" ordering used by the allocator:
//! level ascending, then row ascending, then seat number ascending. By
//! convention level 1 holds the best (most expensive) seats.

use crate::error::{Result, TicketError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a level within a venue.
///
/// Lower ids denote better seats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelId(u32);

impl LevelId {
    /// Creates a `LevelId` from a raw value
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite identity of a seat: `(level, row, number)`.
///
/// The derived ordering is the allocator's tie-break rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    /// Level the seat belongs to
    pub level: LevelId,
    /// Row within the level (1-based)
    pub row: u32,
    /// Seat number within the row (1-based)
    pub number: u32,
}

impl SeatKey {
    /// Creates a new `SeatKey`
    #[must_use]
    pub const fn new(level: LevelId, row: u32, number: u32) -> Self {
        Self { level, row, number }
    }

    /// Smallest possible key on `level`.
    #[must_use]
    pub const fn level_start(level: LevelId) -> Self {
        Self::new(level, 0, 0)
    }

    /// Largest possible key on `level`.
    #[must_use]
    pub const fn level_end(level: LevelId) -> Self {
        Self::new(level, u32::MAX, u32::MAX)
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.level, self.row, self.number)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Ticket price in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars, `None` on overflow
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity, `None` on overflow
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Seat
// ============================================================================

/// A single seat.
///
/// Equality, hashing and ordering are defined by [`SeatKey`] only; the
/// price is carried along but is not part of the identity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Seat {
    key: SeatKey,
    price: Money,
}

impl Seat {
    /// Creates a new seat.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if the level id, row or seat
    /// number is zero, or if the price is zero.
    pub fn new(level: LevelId, row: u32, number: u32, price: Money) -> Result<Self> {
        if level.get() == 0 {
            return Err(TicketError::invalid_argument("level id must be greater than 0"));
        }
        if row == 0 {
            return Err(TicketError::invalid_argument("row must be greater than 0"));
        }
        if number == 0 {
            return Err(TicketError::invalid_argument("seat number must be greater than 0"));
        }
        if price.is_zero() {
            return Err(TicketError::invalid_argument("price must be greater than 0"));
        }

        Ok(Self {
            key: SeatKey::new(level, row, number),
            price,
        })
    }

    /// Identity key of this seat
    #[must_use]
    pub const fn key(&self) -> SeatKey {
        self.key
    }

    /// Level this seat belongs to
    #[must_use]
    pub const fn level(&self) -> LevelId {
        self.key.level
    }

    /// Row of this seat
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.key.row
    }

    /// Seat number within the row
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.key.number
    }

    /// Ticket price for this seat
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }
}

impl PartialEq for Seat {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Seat {}

impl Hash for Seat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Seat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Seat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seat {}", self.key)
    }
}

// ============================================================================
// Level
// ============================================================================

/// A named, priced block of `rows × seats_per_row` seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    id: LevelId,
    name: String,
    price: Money,
    rows: u32,
    seats_per_row: u32,
    seats: Vec<Seat>,
}

impl Level {
    /// Creates a level and pre-generates all of its seats in seat order.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if the id is zero, the name
    /// is empty, the price is zero, either dimension is zero, or the total
    /// seat count does not fit in a `u32`.
    pub fn new(
        id: LevelId,
        name: impl Into<String>,
        price: Money,
        rows: u32,
        seats_per_row: u32,
    ) -> Result<Self> {
        let name = name.into();
        if id.get() == 0 {
            return Err(TicketError::invalid_argument("level id must be greater than 0"));
        }
        if name.is_empty() {
            return Err(TicketError::invalid_argument("level name must not be empty"));
        }
        if rows == 0 {
            return Err(TicketError::invalid_argument("number of rows must be greater than 0"));
        }
        if seats_per_row == 0 {
            return Err(TicketError::invalid_argument("seats per row must be greater than 0"));
        }
        let total = rows
            .checked_mul(seats_per_row)
            .ok_or_else(|| TicketError::invalid_argument("level seat count overflows"))?;

        let mut seats = Vec::with_capacity(total as usize);
        for row in 1..=rows {
            for number in 1..=seats_per_row {
                seats.push(Seat::new(id, row, number, price)?);
            }
        }

        Ok(Self {
            id,
            name,
            price,
            rows,
            seats_per_row,
            seats,
        })
    }

    /// Level id
    #[must_use]
    pub const fn id(&self) -> LevelId {
        self.id
    }

    /// Level name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flat ticket price for every seat on this level
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Number of rows
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Seats in each row
    #[must_use]
    pub const fn seats_per_row(&self) -> u32 {
        self.seats_per_row
    }

    /// Total number of seats (`rows × seats_per_row`)
    #[must_use]
    pub const fn total_seats(&self) -> u32 {
        self.rows * self.seats_per_row
    }

    /// All seats on this level, in seat order
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Whether `seat` belongs to this level
    #[must_use]
    pub fn contains(&self, seat: &Seat) -> bool {
        seat.level() == self.id
            && (1..=self.rows).contains(&seat.row())
            && (1..=self.seats_per_row).contains(&seat.number())
    }
}

// ============================================================================
// Venue
// ============================================================================

/// A venue: an ordered set of levels with pairwise-distinct ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    id: u32,
    name: String,
    levels: BTreeMap<LevelId, Level>,
    min_level: LevelId,
    max_level: LevelId,
}

impl Venue {
    /// The four-level "Grand Hall" used by the simulator and the test
    /// fixtures: 6,250 seats from Orchestra ($100.00) down to Balcony 2
    /// ($4.00).
    ///
    /// # Errors
    ///
    /// Never fails for this fixed layout; the `Result` comes from the
    /// validating constructors.
    pub fn grand_hall() -> Result<Self> {
        let levels = [
            (1, "Orchestra", 10_000, 25, 50),
            (2, "Main", 7_500, 20, 100),
            (3, "Balcony 1", 5_000, 15, 100),
            (4, "Balcony 2", 400, 15, 100),
        ]
        .into_iter()
        .map(|(id, name, cents, rows, per_row)| {
            Level::new(LevelId::new(id), name, Money::from_cents(cents), rows, per_row)
        })
        .collect::<Result<Vec<_>>>()?;
        Self::new(1, "Grand Hall", levels)
    }

    /// Creates a venue from its levels.
    ///
    /// # Errors
    ///
    /// - [`TicketError::InvalidArgument`] if the id is zero, the name is
    ///   empty or no levels are given
    /// - [`TicketError::DuplicateLevel`] if two levels share an id
    pub fn new(id: u32, name: impl Into<String>, levels: impl IntoIterator<Item = Level>) -> Result<Self> {
        let name = name.into();
        if id == 0 {
            return Err(TicketError::invalid_argument("venue id must be greater than 0"));
        }
        if name.is_empty() {
            return Err(TicketError::invalid_argument("venue name must not be empty"));
        }

        let mut by_id = BTreeMap::new();
        for level in levels {
            let level_id = level.id();
            if by_id.insert(level_id, level).is_some() {
                return Err(TicketError::DuplicateLevel(level_id));
            }
        }

        let (Some(min_level), Some(max_level)) = (
            by_id.keys().next().copied(),
            by_id.keys().next_back().copied(),
        ) else {
            return Err(TicketError::invalid_argument("venue must have at least one level"));
        };

        Ok(Self {
            id,
            name,
            levels: by_id,
            min_level,
            max_level,
        })
    }

    /// Venue id
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Venue name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a level by id
    #[must_use]
    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(&id)
    }

    /// Whether the venue has a level with this id
    #[must_use]
    pub fn contains_level(&self, id: LevelId) -> bool {
        self.levels.contains_key(&id)
    }

    /// Levels in ascending id order
    pub fn levels(&self) -> impl DoubleEndedIterator<Item = &Level> + '_ {
        self.levels.values()
    }

    /// Levels whose ids fall within `min..=max`, ascending
    pub fn levels_between(&self, min: LevelId, max: LevelId) -> impl Iterator<Item = &Level> + '_ {
        self.levels.range(min..=max).map(|(_, level)| level)
    }

    /// Lowest (best) level id; default lower search bound
    #[must_use]
    pub const fn min_level(&self) -> LevelId {
        self.min_level
    }

    /// Highest (worst) level id; default upper search bound
    #[must_use]
    pub const fn max_level(&self) -> LevelId {
        self.max_level
    }

    /// Total number of seats across all levels
    #[must_use]
    pub fn total_seats(&self) -> u64 {
        self.levels().map(|level| u64::from(level.total_seats())).sum()
    }

    /// Every seat in the venue, in seat order
    pub fn seats(&self) -> impl Iterator<Item = &Seat> + '_ {
        self.levels().flat_map(|level| level.seats().iter())
    }
}
