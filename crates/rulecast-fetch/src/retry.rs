//! Backoff policy for transient fetch failures.
//!
//! Delays grow as `base * 2^attempt`, capped at `max_delay`. The caller's
//! deadline always wins: a retry whose backoff would end at or past it is
//! not started.

use std::time::Duration;

use rulecast_settings::RetrySettings;
use tokio::time::Instant;

/// Retry parameters for one fetcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Build from the `remote.retry` settings section.
    #[must_use]
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retry number `attempt`, or `None` when retries are
    /// used up or the wait would not finish before `deadline`.
    #[must_use]
    pub fn next_delay(&self, attempt: u32, deadline: Instant) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let delay = self.backoff(attempt);
        (Instant::now() + delay < deadline).then_some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = policy(5);
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn retries_are_bounded() {
        let far = Instant::now() + Duration::from_secs(60);
        let p = policy(2);
        assert!(p.next_delay(0, far).is_some());
        assert!(p.next_delay(1, far).is_some());
        assert!(p.next_delay(2, far).is_none());
        assert!(RetryPolicy::none().next_delay(0, far).is_none());
    }

    #[test]
    fn no_retry_past_deadline() {
        let near = Instant::now() + Duration::from_millis(50);
        assert!(policy(3).next_delay(0, near).is_none());
    }

    #[test]
    fn defaults_follow_settings() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 2);
        assert_eq!(p.base_delay, Duration::from_millis(100));
        assert_eq!(p.max_delay, Duration::from_secs(1));
    }
}
