//! Configuration for log access

use std::time::Duration;

/// Retry policy for polling a reserved-but-unwritten position.
///
/// Reads of an in-flight slot back off exponentially between attempts and
/// surface [`LogError::WaitTimeout`](crate::LogError::WaitTimeout) once the
/// attempt budget is exhausted, rather than blocking indefinitely.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of read attempts before giving up
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound on the backoff between attempts
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryConfig {
    /// The backoff to sleep after the given zero-based attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let backoff = self
            .initial_backoff
            .saturating_mul(1u32.checked_shl(exp).unwrap_or(u32::MAX));
        backoff.min(self.max_backoff)
    }
}
