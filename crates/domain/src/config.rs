//! Booking configuration loaded from environment variables.

use std::time::Duration;

/// Retry settings for booking transactions.
///
/// Reads from environment variables:
/// - `BOOKING_MAX_ATTEMPTS`: attempts per transaction before aborting (default: `5`)
/// - `BOOKING_RETRY_BACKOFF_MS`: delay before the first retry, doubled on each
///   later retry and capped at 200 ms (default: `5`)
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl BookingConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 5;
    pub const MAX_RETRY_BACKOFF: Duration = Duration::from_millis(200);

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let max_attempts = std::env::var("BOOKING_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_MAX_ATTEMPTS);
        let backoff_ms = std::env::var("BOOKING_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_RETRY_BACKOFF_MS);

        Self::default()
            .with_max_attempts(max_attempts)
            .with_retry_backoff(Duration::from_millis(backoff_ms))
    }

    /// Sets the attempt bound. At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Delay before retrying after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(factor)
            .min(Self::MAX_RETRY_BACKOFF)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::from_millis(Self::DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}
