//! Hold expiration scheduler.
//!
//! Tracks every outstanding hold together with a one-shot tokio timer. When
//! the timer fires it runs the expiry future supplied at scheduling time.
//!
//! The scheduler is not synchronized on its own. It lives behind the same
//! lock as the [`SeatReserver`](crate::reserver::SeatReserver) so that
//! `cancel` (confirm path) and `claim` (timer path) can never both succeed
//! for the same hold: whichever takes the lock first removes the entry and
//! the other finds nothing.

use box_office_core::{DateTime, HoldId, SeatHold, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

/// Default time a hold stays pending before it is released.
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug)]
struct PendingExpiration {
    hold: SeatHold,
    expires_at: DateTime<Utc>,
    timer: AbortHandle,
}

/// Registry of pending holds and their expiry timers.
#[derive(Debug)]
pub struct ExpirationScheduler {
    timeout: Duration,
    pending: HashMap<HoldId, PendingExpiration>,
}

impl ExpirationScheduler {
    /// Creates an empty scheduler whose timers fire after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: HashMap::new(),
        }
    }

    /// Delay between scheduling and firing
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers `hold` and spawns its timer.
    ///
    /// After [`timeout`](Self::timeout) the spawned task awaits `on_expire`.
    /// `on_expire` is expected to take the shared lock and [`claim`] the
    /// hold before touching any seat.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// [`claim`]: Self::claim
    pub fn schedule<F>(&mut self, hold: SeatHold, expires_at: DateTime<Utc>, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let hold_id = hold.id();
        let timeout = self.timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(hold_id = %hold_id, "hold expiration timer fired");
            on_expire.await;
        });

        let previous = self.pending.insert(
            hold_id,
            PendingExpiration {
                hold,
                expires_at,
                timer: task.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.timer.abort();
        }
    }

    /// Removes a pending hold and aborts its timer.
    ///
    /// Returns `None` if the hold is not pending (already fired, claimed or
    /// cancelled). Aborting a timer that already finished is harmless.
    pub fn cancel(&mut self, hold_id: HoldId) -> Option<SeatHold> {
        let entry = self.pending.remove(&hold_id)?;
        entry.timer.abort();
        debug!(hold_id = %hold_id, "hold expiration cancelled");
        Some(entry.hold)
    }

    /// Removes a pending hold without touching its timer.
    ///
    /// Called by the firing timer itself; aborting there would cancel the
    /// running expiry.
    pub fn claim(&mut self, hold_id: HoldId) -> Option<SeatHold> {
        self.pending.remove(&hold_id).map(|entry| entry.hold)
    }

    /// Aborts every timer and returns the holds that were pending.
    pub fn cancel_all(&mut self) -> Vec<SeatHold> {
        let mut holds: Vec<_> = self
            .pending
            .drain()
            .map(|(_, entry)| {
                entry.timer.abort();
                entry.hold
            })
            .collect();
        holds.sort_by_key(SeatHold::id);
        holds
    }

    /// A pending hold, if any
    #[must_use]
    pub fn get(&self, hold_id: HoldId) -> Option<&SeatHold> {
        self.pending.get(&hold_id).map(|entry| &entry.hold)
    }

    /// Wall-clock deadline of a pending hold
    #[must_use]
    pub fn expires_at(&self, hold_id: HoldId) -> Option<DateTime<Utc>> {
        self.pending.get(&hold_id).map(|entry| entry.expires_at)
    }

    /// Number of pending holds
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for ExpirationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_TIMEOUT)
    }
}

impl Drop for ExpirationScheduler {
    fn drop(&mut self) {
        for entry in self.pending.values() {
            entry.timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use box_office_core::{LevelId, Money, Seat};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hold(id: u64) -> SeatHold {
        let seat = Seat::new(LevelId::new(1), 1, 1, Money::from_cents(100)).unwrap();
        SeatHold::new(HoldId::new(id), "a@x.com", vec![seat]).unwrap()
    }

    fn counting(fired: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let fired = Arc::clone(fired);
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_timeout() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut scheduler = ExpirationScheduler::new(Duration::from_secs(10));
        scheduler.schedule(hold(1), Utc::now(), counting(&fired));
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // firing does not remove the entry; the expiry future claims it
        assert!(scheduler.claim(HoldId::new(1)).is_some());
        assert!(scheduler.claim(HoldId::new(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut scheduler = ExpirationScheduler::new(Duration::from_secs(10));
        scheduler.schedule(hold(1), Utc::now(), counting(&fired));

        assert_eq!(scheduler.cancel(HoldId::new(1)).map(|h| h.id()), Some(HoldId::new(1)));
        assert!(scheduler.is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_firing_is_safe() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut scheduler = ExpirationScheduler::new(Duration::from_secs(1));
        scheduler.schedule(hold(7), Utc::now(), counting(&fired));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(scheduler.cancel(HoldId::new(7)).is_some());
        assert!(scheduler.cancel(HoldId::new(7)).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_and_queries() {
        let fired = Arc::new(AtomicUsize::new(0));
        let deadline = Utc::now();
        let mut scheduler = ExpirationScheduler::default();
        assert_eq!(scheduler.timeout(), DEFAULT_HOLD_TIMEOUT);

        scheduler.schedule(hold(2), deadline, counting(&fired));
        scheduler.schedule(hold(1), deadline, counting(&fired));
        assert_eq!(scheduler.expires_at(HoldId::new(2)), Some(deadline));
        assert!(scheduler.get(HoldId::new(1)).is_some());

        let cancelled: Vec<_> = scheduler.cancel_all().iter().map(SeatHold::id).collect();
        assert_eq!(cancelled, vec![HoldId::new(1), HoldId::new(2)]);

        tokio::time::sleep(DEFAULT_HOLD_TIMEOUT * 2).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
