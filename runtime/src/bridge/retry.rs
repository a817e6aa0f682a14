//! Bounded retry policy shared by every bridge operation.

use crate::settings::BridgeSettings;
use std::time::Duration;

/// Upper bound on a single backoff delay, unless the base delay is longer.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Attempt ceiling and delays between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Wait after injecting the page runtime before talking to it.
    pub settle_delay: Duration,
    /// Wait before retrying a failure that needed no reinjection.
    pub retry_delay: Duration,
    /// Multiplier applied to `retry_delay` per further attempt; 1.0 is fixed.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle_delay: Duration::from_millis(1500),
            retry_delay: Duration::from_millis(1000),
            backoff: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, given `attempt` (1-based) failed.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let ceiling = MAX_RETRY_DELAY.max(self.retry_delay);
        let scaled = self.retry_delay.as_secs_f64() * self.backoff.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(scaled)
            .unwrap_or(ceiling)
            .min(ceiling)
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }
}

impl From<&BridgeSettings> for RetryPolicy {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            backoff: settings.backoff,
        }
    }
}
