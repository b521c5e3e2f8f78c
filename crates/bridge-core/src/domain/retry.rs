//! # Retry Policy
//!
//! Bounded, backed-off re-attempts for calls. Attempt indices are zero-based;
//! `max_attempts` of 0 or 1 both mean a single attempt, never "never call".
//!
//! The default predicate retries only timeout-class failures. Remote-reported
//! errors are not retried by default: a responder that answered with an error
//! already received the request, and replaying it is the caller's decision to
//! make via [`RetryPolicy::with_predicate`].

use bridge_types::BridgeError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type Predicate = Arc<dyn Fn(&BridgeError) -> bool + Send + Sync>;

/// Retry parameters for a call.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 and 1 both mean one attempt.
    pub max_attempts: u32,
    /// Delay before the first re-attempt.
    pub base_delay: Duration,
    /// Multiplier applied per attempt: `base * multiplier^attempt`.
    pub backoff_multiplier: f64,
    /// Upper bound on any single inter-attempt delay.
    pub max_delay: Duration,
    predicate: Predicate,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

    /// A single attempt, no retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(
            1,
            Self::DEFAULT_BASE_DELAY,
            Self::DEFAULT_BACKOFF_MULTIPLIER,
            Self::DEFAULT_MAX_DELAY,
        )
    }

    /// Retries with the default timeout-only predicate.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        backoff_multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
            max_delay,
            predicate: Arc::new(BridgeError::is_timeout),
        }
    }

    /// Substitute the retryability predicate; any failure the predicate
    /// accepts becomes retryable, including remote-reported errors.
    #[must_use]
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&BridgeError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Effective attempt count; never zero.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    #[must_use]
    pub fn should_retry(&self, error: &BridgeError) -> bool {
        (self.predicate)(error)
    }

    /// `min(base_delay * backoff_multiplier^attempt, max_delay)` for the
    /// zero-based `attempt` that just failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = base_ms * self.backoff_multiplier.powi(exponent);
        let cap_ms = self.max_delay.as_millis() as f64;
        Duration::from_millis(scaled.min(cap_ms).max(0.0) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}
