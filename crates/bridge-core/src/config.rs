//! # Bridge Configuration
//!
//! All tunables the surrounding application supplies: timeouts, handshake
//! retry parameters, the default retry policy, the trust allow-set, an
//! optional multiplex channel, and the debug logging flag.

use crate::domain::retry::RetryPolicy;
use crate::domain::trust::TrustPolicy;
use std::time::Duration;

/// Configuration for one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Default deadline for a single call attempt.
    pub call_timeout: Duration,
    /// Deadline for a single handshake attempt.
    pub handshake_timeout: Duration,
    /// How many handshake attempts `connect()` makes before giving up.
    pub handshake_attempts: u32,
    /// Fixed delay between handshake attempts.
    pub handshake_retry_delay: Duration,
    /// Default retry policy for calls; individual calls may override.
    pub retry: RetryPolicy,
    /// The trust allow-set gating every inbound message.
    pub trust: TrustPolicy,
    /// Multiplexing identifier so several logical bridges can share one
    /// physical transport. Envelopes on other channels are dropped.
    pub channel: Option<String>,
    /// When set, dropped inbound traffic is logged at debug level.
    pub debug: bool,
}

impl BridgeConfig {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 3;
    pub const DEFAULT_HANDSHAKE_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// Defaults everywhere except trust, which has no safe default and must
    /// be chosen explicitly.
    #[must_use]
    pub fn new(trust: TrustPolicy) -> Self {
        Self {
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
            handshake_timeout: Self::DEFAULT_HANDSHAKE_TIMEOUT,
            handshake_attempts: Self::DEFAULT_HANDSHAKE_ATTEMPTS,
            handshake_retry_delay: Self::DEFAULT_HANDSHAKE_RETRY_DELAY,
            retry: RetryPolicy::disabled(),
            trust,
            channel: None,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_handshake(mut self, timeout: Duration, attempts: u32, retry_delay: Duration) -> Self {
        self.handshake_timeout = timeout;
        self.handshake_attempts = attempts;
        self.handshake_retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Per-call overrides for [`crate::Bridge::invoke_with`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Overrides the bridge's default call timeout.
    pub timeout: Option<Duration>,
    /// Overrides the bridge's default retry policy.
    pub retry: Option<RetryPolicy>,
}

impl CallOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}
