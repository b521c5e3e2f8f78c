//! # Connection State Machine
//!
//! The single source of truth for whether calls are currently permitted.
//!
//! ```text
//! disconnected ──connect()──→ connecting ──handshake ok──→ connected
//!      ▲                          │
//!      └──────retries exhausted───┘
//!
//! any state ──destroy()──→ destroyed (absorbing)
//! ```

use bridge_types::BridgeError;
use parking_lot::Mutex;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state; no handshake has completed.
    Disconnected,
    /// A handshake is in flight.
    Connecting,
    /// Handshake completed; calls are permitted.
    Connected,
    /// Terminal. No transition leaves this state.
    Destroyed,
}

/// Outcome of asking to begin a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAdmission {
    /// Transitioned to `Connecting`; the caller owns the handshake attempt.
    Begin,
    /// Already connected; `connect()` is a benign no-op.
    AlreadyConnected,
}

/// Mutex-guarded state cell validating every transition.
#[derive(Debug)]
pub struct StateCell {
    inner: Mutex<ConnectionState>,
}

impl StateCell {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ConnectionState::Disconnected),
        }
    }

    #[must_use]
    pub fn current(&self) -> ConnectionState {
        *self.inner.lock()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.current() == ConnectionState::Connected
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.current() == ConnectionState::Destroyed
    }

    /// Admission check for `connect()`.
    ///
    /// Legal from `Disconnected`. While `Connecting`, a second `connect()` is
    /// rejected as already in progress; while `Connected` it is an idempotent
    /// success.
    pub fn begin_connect(&self) -> Result<ConnectAdmission, BridgeError> {
        let mut state = self.inner.lock();
        match *state {
            ConnectionState::Disconnected => {
                *state = ConnectionState::Connecting;
                Ok(ConnectAdmission::Begin)
            }
            ConnectionState::Connecting => Err(BridgeError::HandshakeFailed {
                attempts: 0,
                reason: "handshake already in progress".into(),
                cause: None,
            }),
            ConnectionState::Connected => Ok(ConnectAdmission::AlreadyConnected),
            ConnectionState::Destroyed => Err(BridgeError::Destroyed),
        }
    }

    /// Handshake success, either role. Returns false once destroyed.
    pub fn mark_connected(&self) -> bool {
        let mut state = self.inner.lock();
        match *state {
            ConnectionState::Destroyed => false,
            _ => {
                *state = ConnectionState::Connected;
                true
            }
        }
    }

    /// Initiator handshake exhausted: back to `Disconnected`.
    pub fn revert_connecting(&self) {
        let mut state = self.inner.lock();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Disconnected;
        }
    }

    /// Terminal transition. Returns true only on the first call.
    pub fn destroy(&self) -> bool {
        let mut state = self.inner.lock();
        if *state == ConnectionState::Destroyed {
            false
        } else {
            *state = ConnectionState::Destroyed;
            true
        }
    }

    /// Gate for `invoke()`/`notify()` and outbound request sending.
    pub fn require_connected(&self) -> Result<(), BridgeError> {
        match self.current() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Destroyed => Err(BridgeError::Destroyed),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(BridgeError::NotConnected)
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
