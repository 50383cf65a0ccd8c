//! Service façade.
//!
//! [`DefaultTicketService`] is the public entry point. It owns one
//! [`SeatReserver`] and one [`ExpirationScheduler`] behind a single
//! venue-wide `tokio::sync::Mutex` and implements
//! [`TicketService`](box_office_core::service::TicketService).
//!
//! # Confirm / expire race
//!
//! Both the confirm path and the firing timer take the same lock and then
//! remove the hold from the scheduler (`cancel` and `claim` respectively).
//! Whoever removes it first wins:
//!
//! - confirm first: the timer's `claim` finds nothing and does nothing
//! - timer first: `reserve_seats` finds no pending hold and fails with
//!   [`TicketError::HoldNotFound`]
//!
//! The expiry listener is notified after the lock has been released.

use crate::config::ServiceConfig;
use crate::metrics::TicketMetrics;
use crate::reserver::{LevelAvailability, SeatReserver};
use crate::scheduler::ExpirationScheduler;
use box_office_core::environment::{Clock, HoldExpiryListener, SystemClock};
use box_office_core::service::TicketService;
use box_office_core::{
    ConfirmationCode, DateTime, HoldId, LevelId, Result, SeatHold, TicketError, Utc, Venue,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Everything guarded by the venue-wide lock.
struct ServiceState {
    reserver: SeatReserver,
    scheduler: ExpirationScheduler,
}

impl ServiceState {
    fn record_occupancy(&self) {
        let available = self.reserver.available_count(None).unwrap_or(0);
        TicketMetrics::record_occupancy(self.scheduler.len(), available);
    }
}

struct Shared {
    venue: Arc<Venue>,
    state: Mutex<ServiceState>,
    listener: Option<Arc<dyn HoldExpiryListener>>,
    clock: Arc<dyn Clock>,
    shutting_down: AtomicBool,
}

impl Shared {
    /// Body of every expiry timer.
    async fn expire_hold(&self, hold_id: HoldId) {
        let hold = {
            let mut state = self.state.lock().await;

            let Some(hold) = state.scheduler.claim(hold_id) else {
                debug!(hold_id = %hold_id, "hold already confirmed, nothing to expire");
                return;
            };
            if let Err(e) = state.reserver.expire(&hold) {
                error!(hold_id = %hold_id, error = %e, "expiring hold found seats in an unexpected state");
                return;
            }
            state.record_occupancy();
            hold
        };

        info!(
            hold_id = %hold_id,
            seats = hold.seat_count(),
            customer_email = hold.customer_email(),
            "hold expired"
        );
        TicketMetrics::record_expiration();
        self.notify_expired(&hold);
    }

    fn notify_expired(&self, hold: &SeatHold) {
        if let Some(listener) = &self.listener {
            listener.on_hold_expired(hold);
        }
    }
}

/// Thread-safe ticket service for a single venue.
///
/// Cloning is cheap; clones share the same seats and holds.
///
/// # Example
///
/// ```
/// use box_office_core::seating::{Level, LevelId, Money, Venue};
/// use box_office_core::service::TicketService;
/// use box_office_runtime::service::DefaultTicketService;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> box_office_core::Result<()> {
/// let venue = Arc::new(Venue::new(1, "Hall", vec![
///     Level::new(LevelId::new(1), "Orchestra", Money::from_cents(10_000), 2, 2)?,
/// ])?);
/// let service = DefaultTicketService::builder(venue)
///     .hold_timeout(Duration::from_secs(30))
///     .build()?;
///
/// let hold = service
///     .find_and_hold_seats(3, None, None, "a@x.com")
///     .await?
///     .expect("four seats are free");
/// assert_eq!(service.num_seats_available(None).await?, 1);
///
/// let code = service.reserve_seats(hold.id(), "a@x.com").await?;
/// assert!(!code.to_string().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DefaultTicketService {
    shared: Arc<Shared>,
}

impl DefaultTicketService {
    /// Starts building a service for `venue`.
    #[must_use]
    pub fn builder(venue: Arc<Venue>) -> TicketServiceBuilder {
        TicketServiceBuilder::new(venue)
    }

    /// Creates a service with `config`, the system clock and no listener.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if the hold timeout is zero.
    pub fn new(venue: Arc<Venue>, config: ServiceConfig) -> Result<Self> {
        Self::builder(venue).config(config).build()
    }

    /// The venue being sold
    #[must_use]
    pub fn venue(&self) -> Arc<Venue> {
        Arc::clone(&self.shared.venue)
    }

    /// Per-level breakdown of available, held and reserved seats.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidLevel`] if the venue has no such level.
    pub async fn availability(&self, level: LevelId) -> Result<LevelAvailability> {
        let state = self.shared.state.lock().await;
        state.reserver.availability(level)
    }

    /// Number of holds waiting for confirmation or expiry
    pub async fn pending_holds(&self) -> usize {
        self.shared.state.lock().await.scheduler.len()
    }

    /// When a pending hold will expire, `None` if it is not pending
    pub async fn hold_expires_at(&self, hold_id: HoldId) -> Option<DateTime<Utc>> {
        self.shared.state.lock().await.scheduler.expires_at(hold_id)
    }

    /// Looks up a confirmed hold by its confirmation code
    pub async fn reservation(&self, code: ConfirmationCode) -> Option<SeatHold> {
        self.shared.state.lock().await.reserver.reservation(&code).cloned()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::Acquire)
    }

    /// Stops accepting new holds and releases every pending hold now.
    ///
    /// Pending timers are aborted, their seats return to available and the
    /// expiry listener is notified for each released hold. Confirmed
    /// reservations are kept. Calling it again is a no-op.
    ///
    /// Returns the number of holds released.
    pub async fn shutdown(&self) -> usize {
        info!("Initiating ticket service shutdown");

        let released = {
            let mut state = self.shared.state.lock().await;
            self.shared.shutting_down.store(true, Ordering::Release);

            let holds = state.scheduler.cancel_all();
            for hold in &holds {
                if let Err(e) = state.reserver.expire(hold) {
                    error!(hold_id = %hold.id(), error = %e, "failed to release hold on shutdown");
                }
            }
            state.record_occupancy();
            holds
        };

        for hold in &released {
            TicketMetrics::record_expiration();
            self.shared.notify_expired(hold);
        }
        info!(released = released.len(), "Ticket service shut down");
        released.len()
    }

    async fn count_available(&self, level: Option<LevelId>) -> Result<u32> {
        let state = self.shared.state.lock().await;
        state.reserver.available_count(level)
    }

    async fn hold_seats(
        &self,
        num_seats: u32,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
        customer_email: &str,
    ) -> Result<Option<SeatHold>> {
        let mut state = self.shared.state.lock().await;
        if self.shared.shutting_down.load(Ordering::Acquire) {
            warn!(num_seats, "hold requested after shutdown");
            return Err(TicketError::ShuttingDown);
        }

        let Some(hold) = state
            .reserver
            .find_and_hold(num_seats, min_level, max_level, customer_email)?
        else {
            info!(
                num_seats,
                min_level = ?min_level.map(LevelId::get),
                max_level = ?max_level.map(LevelId::get),
                "not enough seats available"
            );
            TicketMetrics::record_rejected_hold();
            return Ok(None);
        };

        let timeout = state.scheduler.timeout();
        let expires_at = expiry_deadline(self.shared.clock.now(), timeout);
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let hold_id = hold.id();
        state.scheduler.schedule(hold.clone(), expires_at, async move {
            if let Some(shared) = weak.upgrade() {
                shared.expire_hold(hold_id).await;
            }
        });
        state.record_occupancy();
        drop(state);

        info!(
            hold_id = %hold_id,
            seats = hold.seat_count(),
            customer_email,
            expires_at = %expires_at,
            "seats held"
        );
        TicketMetrics::record_hold(hold.seat_count());
        Ok(Some(hold))
    }

    async fn confirm_hold(&self, hold_id: HoldId, customer_email: &str) -> Result<ConfirmationCode> {
        if customer_email.is_empty() {
            TicketMetrics::record_reservation_failure("invalid_argument");
            return Err(TicketError::invalid_argument("customer email must not be empty"));
        }

        let mut state = self.shared.state.lock().await;

        let Some(hold) = state.scheduler.get(hold_id).cloned() else {
            warn!(hold_id = %hold_id, "hold not found or expired");
            TicketMetrics::record_reservation_failure("not_found");
            return Err(TicketError::HoldNotFound(hold_id));
        };
        if hold.customer_email() != customer_email {
            warn!(hold_id = %hold_id, customer_email, "email does not match hold");
            TicketMetrics::record_reservation_failure("permission_denied");
            return Err(TicketError::PermissionDenied(hold_id));
        }

        let code = match state.reserver.confirm(&hold) {
            Ok(code) => code,
            Err(e) => {
                error!(hold_id = %hold_id, error = %e, "pending hold could not be confirmed");
                TicketMetrics::record_reservation_failure("invalid_state");
                return Err(e);
            },
        };
        state.scheduler.cancel(hold_id);
        state.record_occupancy();
        drop(state);

        info!(
            hold_id = %hold_id,
            seats = hold.seat_count(),
            confirmation = %code,
            "seats reserved"
        );
        TicketMetrics::record_reservation();
        Ok(code)
    }
}

impl TicketService for DefaultTicketService {
    fn num_seats_available(&self, level: Option<LevelId>) -> BoxFuture<'_, Result<u32>> {
        Box::pin(self.count_available(level))
    }

    fn find_and_hold_seats<'a>(
        &'a self,
        num_seats: u32,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
        customer_email: &'a str,
    ) -> BoxFuture<'a, Result<Option<SeatHold>>> {
        Box::pin(self.hold_seats(num_seats, min_level, max_level, customer_email))
    }

    fn reserve_seats<'a>(
        &'a self,
        hold_id: HoldId,
        customer_email: &'a str,
    ) -> BoxFuture<'a, Result<ConfirmationCode>> {
        Box::pin(self.confirm_hold(hold_id, customer_email))
    }
}

impl std::fmt::Debug for DefaultTicketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTicketService")
            .field("venue", &self.shared.venue.name())
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

fn expiry_deadline(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Builder for [`DefaultTicketService`].
pub struct TicketServiceBuilder {
    venue: Arc<Venue>,
    config: ServiceConfig,
    listener: Option<Arc<dyn HoldExpiryListener>>,
    clock: Arc<dyn Clock>,
}

impl TicketServiceBuilder {
    fn new(venue: Arc<Venue>) -> Self {
        Self {
            venue,
            config: ServiceConfig::default(),
            listener: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the whole configuration
    #[must_use]
    pub const fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the hold timeout
    #[must_use]
    pub const fn hold_timeout(mut self, timeout: Duration) -> Self {
        self.config.hold_timeout = timeout;
        self
    }

    /// Notify `listener` whenever a hold expires
    #[must_use]
    pub fn expiry_listener(mut self, listener: impl HoldExpiryListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Clock used to stamp hold deadlines
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds the service with every seat available.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidArgument`] if the hold timeout is zero.
    pub fn build(self) -> Result<DefaultTicketService> {
        self.config
            .validate()
            .map_err(|e| TicketError::invalid_argument(e.to_string()))?;

        info!(
            venue = self.venue.name(),
            total_seats = self.venue.total_seats(),
            hold_timeout_ms = u64::try_from(self.config.hold_timeout.as_millis()).unwrap_or(u64::MAX),
            "Ticket service created"
        );

        let state = ServiceState {
            reserver: SeatReserver::new(Arc::clone(&self.venue)),
            scheduler: ExpirationScheduler::new(self.config.hold_timeout),
        };
        state.record_occupancy();

        Ok(DefaultTicketService {
            shared: Arc::new(Shared {
                venue: self.venue,
                state: Mutex::new(state),
                listener: self.listener,
                clock: self.clock,
                shutting_down: AtomicBool::new(false),
            }),
        })
    }
}
