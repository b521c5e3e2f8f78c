//! # Trust Gate
//!
//! Gatekeeps every inbound message by sender identity before anything else
//! touches it. This is a silent-failure boundary: a rejected message is
//! dropped (debug-logged only, never answered), so an untrusted peer can
//! neither observe whether its message was processed nor deny service to a
//! legitimate caller.
//!
//! Once a handshake has pinned the counterpart, the gate additionally
//! requires every delivery to arrive through that exact connection.

use bridge_types::{PeerHandle, SenderIdentity};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Ordered allow-set of sender identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Wildcard sentinel: accept every identity. Emits a one-time insecurity
    /// warning on first use.
    Any,
    /// Accept only the listed identities.
    AllowList(Vec<SenderIdentity>),
}

impl TrustPolicy {
    /// Build an allow-list policy.
    #[must_use]
    pub fn allow<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SenderIdentity>,
    {
        Self::AllowList(identities.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn permits(&self, identity: &SenderIdentity) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(allowed) => allowed.contains(identity),
        }
    }
}

/// Why an inbound delivery was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Identity absent from the allow-set.
    UntrustedIdentity,
    /// Identity allowed, but the delivery did not arrive through the
    /// counterpart connection pinned at handshake time.
    CounterpartMismatch,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UntrustedIdentity => f.write_str("untrusted sender identity"),
            Self::CounterpartMismatch => f.write_str("counterpart reference mismatch"),
        }
    }
}

/// Evaluates the trust policy against each delivery.
#[derive(Debug)]
pub struct TrustGate {
    policy: TrustPolicy,
    warned: AtomicBool,
}

impl TrustGate {
    #[must_use]
    pub fn new(policy: TrustPolicy) -> Self {
        Self {
            policy,
            warned: AtomicBool::new(false),
        }
    }

    /// Gatekeep one inbound delivery.
    ///
    /// `pinned` is the counterpart recorded at handshake time, if any. The
    /// caller drops the message on `Err`; nothing is ever sent back.
    pub fn admit(
        &self,
        identity: &SenderIdentity,
        peer: PeerHandle,
        pinned: Option<(&SenderIdentity, PeerHandle)>,
    ) -> Result<(), DropReason> {
        match &self.policy {
            TrustPolicy::Any => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        "trust checking is disabled: every sender identity will be accepted"
                    );
                }
            }
            TrustPolicy::AllowList(_) => {
                if !self.policy.permits(identity) {
                    return Err(DropReason::UntrustedIdentity);
                }
            }
        }

        if let Some((pinned_identity, pinned_peer)) = pinned {
            if pinned_identity != identity || pinned_peer != peer {
                return Err(DropReason::CounterpartMismatch);
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }
}
