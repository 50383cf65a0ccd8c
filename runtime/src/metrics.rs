//! Prometheus metrics for the ticket service.
//!
//! The service records through the `metrics` facade unconditionally. Nothing
//! is collected unless a recorder is installed, e.g. with
//! [`MetricsRecorder::install`].
//!
//! # Example
//!
//! ```rust,no_run
//! use box_office_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run the service ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics recorder
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Installs a Prometheus recorder and renders its text exposition.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if the recorder cannot be installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this
    /// logs a warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "box_office_holds_created_total",
        "Total number of seat holds created"
    );
    describe_counter!(
        "box_office_holds_rejected_total",
        "Total number of hold requests that found too few seats"
    );
    describe_counter!(
        "box_office_reservations_total",
        "Total number of holds confirmed into reservations"
    );
    describe_counter!(
        "box_office_holds_expired_total",
        "Total number of holds released by the expiration timer"
    );
    describe_counter!(
        "box_office_reservation_failures_total",
        "Total number of rejected reservation attempts"
    );
    describe_histogram!(
        "box_office_hold_size_seats",
        "Number of seats in each created hold"
    );
    describe_gauge!(
        "box_office_pending_holds",
        "Holds currently waiting for confirmation or expiry"
    );
    describe_gauge!(
        "box_office_seats_available",
        "Seats currently free for allocation"
    );
}

/// Ticket service metrics recorder.
pub struct TicketMetrics;

impl TicketMetrics {
    /// Record a created hold.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_hold(seats: usize) {
        counter!("box_office_holds_created_total").increment(1);
        histogram!("box_office_hold_size_seats").record(seats as f64);
    }

    /// Record a hold request that could not be satisfied.
    pub fn record_rejected_hold() {
        counter!("box_office_holds_rejected_total").increment(1);
    }

    /// Record a confirmed reservation.
    pub fn record_reservation() {
        counter!("box_office_reservations_total").increment(1);
    }

    /// Record a failed reservation attempt.
    pub fn record_reservation_failure(reason: &'static str) {
        counter!("box_office_reservation_failures_total", "reason" => reason).increment(1);
    }

    /// Record an expired hold.
    pub fn record_expiration() {
        counter!("box_office_holds_expired_total").increment(1);
    }

    /// Record the pending hold and available seat gauges.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_occupancy(pending_holds: usize, seats_available: u32) {
        gauge!("box_office_pending_holds").set(pending_holds as f64);
        gauge!("box_office_seats_available").set(f64::from(seats_available));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_recorder_creation() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.handle().is_none());
        assert!(recorder.render().is_none());
    }

    #[test]
    fn test_recorder_render() {
        let mut recorder = MetricsRecorder::new();
        recorder.install().unwrap();

        TicketMetrics::record_hold(3);
        TicketMetrics::record_reservation();
        TicketMetrics::record_occupancy(0, 17);

        // If another test installed the recorder first, handle is None.
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("box_office_holds_created_total"));
            assert!(rendered.contains("box_office_reservations_total"));
        }
    }
}
