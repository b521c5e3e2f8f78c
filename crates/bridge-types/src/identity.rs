//! # Identity Newtypes
//!
//! The bridge distinguishes two notions of "who sent this":
//!
//! - [`SenderIdentity`]: the *claimed* origin of an endpoint (an opaque
//!   string such as `"app://host"`). Trust policies are expressed over these.
//! - [`PeerHandle`]: the *transport-level* reference to one concrete
//!   counterpart connection, minted by the transport adapter. After a
//!   handshake the bridge pins the counterpart's handle and rejects traffic
//!   arriving through any other one, even under the same identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The claimed origin of an endpoint.
///
/// Identity is asserted by the transport adapter per delivery; the bridge
/// never takes it from message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderIdentity(String);

impl SenderIdentity {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SenderIdentity {
    fn from(origin: &str) -> Self {
        Self::new(origin)
    }
}

impl From<String> for SenderIdentity {
    fn from(origin: String) -> Self {
        Self(origin)
    }
}

impl fmt::Display for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to one concrete counterpart connection.
///
/// Handles are minted by the transport adapter and are only meaningful within
/// it; the bridge treats them as tokens to compare and to pass back as a
/// destination hint when sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle(pub u64);

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}
