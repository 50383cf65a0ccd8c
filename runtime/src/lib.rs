//! # Box Office Runtime
//!
//! Runtime implementation of the Box Office ticketing engine.
//!
//! This crate wires the core seating types into a running service: it
//! allocates seats, schedules hold expirations on the tokio runtime and
//! serializes every operation behind one venue-wide lock.
//!
//! ## Core Components
//!
//! - **`SeatReserver`**: allocator and reservation engine (best seats first)
//! - **`ExpirationScheduler`**: one cancellable timer per pending hold
//! - **`DefaultTicketService`**: the thread-safe façade implementing
//!   [`TicketService`]
//! - **`ServiceConfig`**: hold timeout, loadable from the environment
//!
//! ## Example
//!
//! ```
//! use box_office_core::seating::{Level, LevelId, Money, Venue};
//! use box_office_runtime::{DefaultTicketService, ServiceConfig, TicketService};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> box_office_core::Result<()> {
//! let venue = Arc::new(Venue::new(1, "Hall", vec![
//!     Level::new(LevelId::new(1), "Orchestra", Money::from_cents(10_000), 25, 50)?,
//!     Level::new(LevelId::new(2), "Main", Money::from_cents(7_500), 20, 100)?,
//! ])?);
//! let service = DefaultTicketService::new(venue, ServiceConfig::default())?;
//!
//! if let Some(hold) = service.find_and_hold_seats(4, None, None, "a@x.com").await? {
//!     let code = service.reserve_seats(hold.id(), "a@x.com").await?;
//!     println!("confirmed {code}");
//! }
//! assert_eq!(service.num_seats_available(Some(LevelId::new(1))).await?, 1_246);
//! # Ok(())
//! # }
//! ```

/// Configuration loaded from the environment
pub mod config;

/// Prometheus metrics for observability
pub mod metrics;

/// Allocator / reservation engine
pub mod reserver;

/// Hold expiration timers
pub mod scheduler;

/// Thread-safe service façade
pub mod service;

pub use box_office_core::service::TicketService;
pub use config::{ConfigError, ServiceConfig, SimulationConfig, TimeUnit};
pub use reserver::{LevelAvailability, SeatReserver};
pub use scheduler::{DEFAULT_HOLD_TIMEOUT, ExpirationScheduler};
pub use service::{DefaultTicketService, TicketServiceBuilder};
