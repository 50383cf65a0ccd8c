//! Configuration for the ticket service and the simulator.
//!
//! Loads configuration from environment variables with sensible defaults.
//!
//! | Variable                         | Default   |
//! |----------------------------------|-----------|
//! | `BOX_OFFICE_HOLD_TIMEOUT`        | `2`       |
//! | `BOX_OFFICE_HOLD_TIMEOUT_UNIT`   | `minutes` |
//! | `BOX_OFFICE_SIM_WORKERS`         | `4`       |
//! | `BOX_OFFICE_SIM_DURATION_SECS`   | `30`      |
//! | `BOX_OFFICE_SIM_INTERVAL_MILLIS` | `100`     |
//! | `BOX_OFFICE_SIM_MAX_SEATS`       | `10`      |

use crate::scheduler::DEFAULT_HOLD_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Environment variable name
        key: &'static str,
        /// Raw value found
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// The hold timeout resolved to zero
    #[error("Hold timeout must be greater than zero")]
    ZeroHoldTimeout,
}

/// Unit for the hold timeout amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Milliseconds
    Millis,
    /// Seconds
    Seconds,
    /// Minutes
    Minutes,
    /// Hours
    Hours,
}

impl TimeUnit {
    /// Converts `amount` of this unit into a `Duration`, saturating on overflow
    #[must_use]
    pub const fn duration(self, amount: u64) -> Duration {
        match self {
            Self::Millis => Duration::from_millis(amount),
            Self::Seconds => Duration::from_secs(amount),
            Self::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            Self::Hours => Duration::from_secs(amount.saturating_mul(3_600)),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "millis" | "milliseconds" => Ok(Self::Millis),
            "s" | "secs" | "seconds" => Ok(Self::Seconds),
            "m" | "mins" | "minutes" => Ok(Self::Minutes),
            "h" | "hours" => Ok(Self::Hours),
            other => Err(format!("unknown time unit {other:?}")),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis => write!(f, "millis"),
            Self::Seconds => write!(f, "seconds"),
            Self::Minutes => write!(f, "minutes"),
            Self::Hours => write!(f, "hours"),
        }
    }
}

/// Configuration for [`DefaultTicketService`](crate::service::DefaultTicketService).
///
/// # Example
///
/// ```
/// use box_office_runtime::config::{ServiceConfig, TimeUnit};
/// use std::time::Duration;
///
/// let config = ServiceConfig::default().with_hold_timeout_in(10, TimeUnit::Seconds);
/// assert_eq!(config.hold_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// How long a hold stays pending before its seats are released
    pub hold_timeout: Duration,
}

impl ServiceConfig {
    /// Create a configuration with a custom hold timeout
    #[must_use]
    pub const fn new(hold_timeout: Duration) -> Self {
        Self { hold_timeout }
    }

    /// Set the hold timeout
    #[must_use]
    pub const fn with_hold_timeout(mut self, timeout: Duration) -> Self {
        self.hold_timeout = timeout;
        self
    }

    /// Set the hold timeout as an amount and a unit
    #[must_use]
    pub const fn with_hold_timeout_in(mut self, amount: u64, unit: TimeUnit) -> Self {
        self.hold_timeout = unit.duration(amount);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but cannot be parsed, or
    /// if the resulting timeout is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let amount: u64 = parse_var("BOX_OFFICE_HOLD_TIMEOUT", 2)?;
        let unit: TimeUnit = parse_var("BOX_OFFICE_HOLD_TIMEOUT_UNIT", TimeUnit::Minutes)?;

        let config = Self::default().with_hold_timeout_in(amount, unit);
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroHoldTimeout`] if the hold timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hold_timeout.is_zero() {
            return Err(ConfigError::ZeroHoldTimeout);
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
        }
    }
}

/// Load-generation settings for the `box-office-simulate` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Ticket service settings
    pub service: ServiceConfig,
    /// Number of concurrent simulated customers
    pub workers: usize,
    /// How long to run
    pub duration: Duration,
    /// Pause between requests of one worker
    pub request_interval: Duration,
    /// Upper bound of seats per request (requests ask for 1..=max)
    pub max_seats_per_request: u32,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl SimulationConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let service = if env::var("BOX_OFFICE_HOLD_TIMEOUT").is_ok() {
            ServiceConfig::from_env()?
        } else {
            // short holds make expirations visible during a run
            ServiceConfig::default().with_hold_timeout_in(10, TimeUnit::Seconds)
        };

        Ok(Self {
            service,
            workers: parse_var("BOX_OFFICE_SIM_WORKERS", 4)?,
            duration: Duration::from_secs(parse_var("BOX_OFFICE_SIM_DURATION_SECS", 30)?),
            request_interval: Duration::from_millis(parse_var("BOX_OFFICE_SIM_INTERVAL_MILLIS", 100)?),
            max_seats_per_request: parse_var::<u32>("BOX_OFFICE_SIM_MAX_SEATS", 10)?.max(1),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "box_office=info".to_string()),
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
                value,
            }),
        },
        Err(_) => Ok(default),
    }
}
