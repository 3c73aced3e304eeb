//! Retry classification and backoff math for step failures and the
//! ingestion poll loop.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How many transient step failures a file task may accumulate before
/// it is marked failed; the last failure in the budget is fatal rather
/// than requeued.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-invocation timeout for a recognition provider call, in seconds.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;

/// How long a claimed task stays leased to a worker before it becomes
/// eligible for redelivery.
pub const DEFAULT_LEASE_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Timeouts, connection errors, rate limits, 5xx. Retried up to the
    /// budget with backoff.
    Transient,
    /// Explicit 4xx, malformed input, unknown provider. Fails the task
    /// immediately.
    Permanent,
}

/// Classify an HTTP status code from a recognition backend.
///
/// 429 and all 5xx are transient; any other 4xx is permanent.
pub fn classify_status(status: u16) -> RetryClass {
    if status == 429 || status >= 500 {
        RetryClass::Transient
    } else {
        RetryClass::Permanent
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Tunable parameters for an exponential-backoff schedule.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Delay before retry attempt number `attempt` (0-based).
///
/// `retry_delay(0, ..)` is the initial delay; each subsequent attempt
/// multiplies it, clamped to the configured maximum. Deterministic so the
/// schedule can be asserted in tests; callers that want jitter add it on
/// top.
pub fn retry_delay(attempt: u32, config: &BackoffConfig) -> Duration {
    let mut delay = config.initial_delay;
    for _ in 0..attempt {
        delay = next_delay(delay, config);
    }
    delay.min(config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_server_errors_are_transient() {
        assert_eq!(classify_status(500), RetryClass::Transient);
        assert_eq!(classify_status(503), RetryClass::Transient);
        assert_eq!(classify_status(429), RetryClass::Transient);
    }

    #[test]
    fn client_errors_are_permanent() {
        assert_eq!(classify_status(400), RetryClass::Permanent);
        assert_eq!(classify_status(404), RetryClass::Permanent);
        assert_eq!(classify_status(422), RetryClass::Permanent);
    }

    #[test]
    fn next_delay_doubles() {
        let config = BackoffConfig::default();
        let d = next_delay(Duration::from_secs(5), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(25), &config);
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = BackoffConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        };
        let expected = [1, 2, 4, 8, 16, 30, 30];
        for (attempt, &expected_secs) in expected.iter().enumerate() {
            assert_eq!(
                retry_delay(attempt as u32, &config),
                Duration::from_secs(expected_secs),
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn retry_delay_is_deterministic() {
        let config = BackoffConfig::default();
        assert_eq!(retry_delay(2, &config), retry_delay(2, &config));
    }
}
