//! # Error Taxonomy
//!
//! Every failure the bridge can surface carries one of the stable codes in
//! [`ErrorCode`]. Responder-side failures cross the wire as an
//! [`ErrorPayload`] inside a response message and are rematerialized on the
//! caller as [`BridgeError::Remote`] with the same code, message, and
//! optional details.
//!
//! `INVALID_ORIGIN` exists in the taxonomy for completeness but is never
//! surfaced by the engine: trust rejections are silent drops, so an untrusted
//! peer cannot observe whether its message was processed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Stable error codes exposed to callers and serialized into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A call or handshake attempt did not complete within its deadline.
    Timeout,
    /// The responder has no handler registered under the requested name.
    MethodNotFound,
    /// A responder handler ran and failed.
    HandlerError,
    /// Inbound message failed the trust gate. Never surfaced; drop-only.
    InvalidOrigin,
    /// The operation requires an established connection.
    NotConnected,
    /// The handshake exhausted its attempts without an acknowledgment.
    HandshakeFailed,
    /// The bridge was destroyed.
    Destroyed,
    /// Anything without a more precise classification.
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "TIMEOUT",
            Self::MethodNotFound => "METHOD_NOT_FOUND",
            Self::HandlerError => "HANDLER_ERROR",
            Self::InvalidOrigin => "INVALID_ORIGIN",
            Self::NotConnected => "NOT_CONNECTED",
            Self::HandshakeFailed => "HANDSHAKE_FAILED",
            Self::Destroyed => "DESTROYED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Wire form of a responder-side failure.
///
/// Serialized into the `error` field of a response message. The `details`
/// value is passed through structurally and never interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Payload for a request naming a method the responder does not expose.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("no handler registered for method '{method}'"),
        )
        .with_details(serde_json::json!({ "method": method }))
    }

    /// Payload for a handler that ran and failed.
    #[must_use]
    pub fn handler_error(method: &str, message: &str, details: Option<Value>) -> Self {
        let payload = Self::new(
            ErrorCode::HandlerError,
            format!("handler for '{method}' failed: {message}"),
        );
        match details {
            Some(details) => payload.with_details(details),
            None => payload,
        }
    }

    /// Payload used when a response reports failure without carrying one.
    #[must_use]
    pub fn missing() -> Self {
        Self::new(
            ErrorCode::Unknown,
            "responder reported failure without an error payload",
        )
    }
}

/// Failures surfaced by bridge operations.
///
/// Callers should branch on [`BridgeError::code`] rather than on variants;
/// the code is the stable contract, the message is for humans.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The call did not receive a matching response within its deadline.
    #[error("call to '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    /// The operation requires an established connection.
    #[error("bridge is not connected")]
    NotConnected,

    /// `connect()` gave up.
    #[error("handshake failed after {attempts} attempt(s): {reason}")]
    HandshakeFailed {
        attempts: u32,
        reason: String,
        #[source]
        cause: Option<Box<BridgeError>>,
    },

    /// The bridge was destroyed, locally and unconditionally.
    #[error("bridge has been destroyed")]
    Destroyed,

    /// A failure reported by the counterpart, carried over the wire.
    #[error("{code}: {message}")]
    Remote {
        code: ErrorCode,
        message: String,
        details: Option<Value>,
    },

    /// Local failure without a more precise classification.
    #[error("bridge failure: {0}")]
    Unknown(String),
}

impl BridgeError {
    /// The stable code for this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::NotConnected => ErrorCode::NotConnected,
            Self::HandshakeFailed { .. } => ErrorCode::HandshakeFailed,
            Self::Destroyed => ErrorCode::Destroyed,
            Self::Remote { code, .. } => *code,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Rematerialize a wire error on the caller side.
    #[must_use]
    pub fn from_wire(payload: ErrorPayload) -> Self {
        Self::Remote {
            code: payload.code,
            message: payload.message,
            details: payload.details,
        }
    }

    /// True for timeout-class failures; the default retry predicate.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.code() == ErrorCode::Timeout
    }
}
