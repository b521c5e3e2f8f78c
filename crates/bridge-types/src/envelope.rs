//! # Message Envelope
//!
//! The universal wrapper for ALL bridge traffic.
//!
//! ## Wire Shape
//!
//! Every message carries a protocol `version`, an optional multiplex
//! `channel`, a locally-unique `id`, a millisecond `timestamp_ms`, and one
//! body variant discriminated by a `type` tag:
//!
//! | `type`              | Key fields                          |
//! |---------------------|-------------------------------------|
//! | `request`           | `method`, `payload`                 |
//! | `response`          | `request_id`, `success`, `data` or `error` |
//! | `handshake_request` | `advertised_methods`                |
//! | `handshake_ack`     | `request_id`, `advertised_methods`  |
//! | `notification`      | `method`, `payload`                 |
//!
//! ## Classification
//!
//! Raw inbound values become typed envelopes in exactly one place,
//! [`Envelope::classify`]: a single `serde` parse followed by version and
//! channel gating. Anything that fails is dropped by the caller; a malformed
//! value from a misbehaving peer must never raise further than this boundary.

use crate::errors::ErrorPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Current protocol version. Checked before anything else is read.
pub const PROTOCOL_VERSION: u16 = 1;

/// Opaque token linking a request to its eventual response.
///
/// Minted per outbound request or handshake attempt by an instance-owned
/// source; never reused by the same bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The tagged union of everything that can appear on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// A correlated call expecting exactly one response.
    Request { method: String, payload: Value },

    /// The settlement of one request, matched by `request_id`.
    Response {
        request_id: CorrelationId,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorPayload>,
    },

    /// Handshake initiation, advertising the sender's callable methods.
    HandshakeRequest { advertised_methods: Vec<String> },

    /// Handshake acknowledgment, referencing the initiating request.
    HandshakeAck {
        request_id: CorrelationId,
        advertised_methods: Vec<String>,
    },

    /// Fire-and-forget: no correlation semantics, no response ever.
    Notification { method: String, payload: Value },
}

impl MessageBody {
    /// Short kind name for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Response { .. } => "response",
            Self::HandshakeRequest { .. } => "handshake_request",
            Self::HandshakeAck { .. } => "handshake_ack",
            Self::Notification { .. } => "notification",
        }
    }
}

/// Why an inbound value was rejected at the classification boundary.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Not a recognizable bridge message at all.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Protocol version this engine does not speak.
    #[error("unsupported protocol version {received} (supported: {PROTOCOL_VERSION})")]
    UnsupportedVersion { received: u16 },

    /// Addressed to a different logical bridge on the shared transport.
    #[error("channel mismatch: expected {expected:?}, received {received:?}")]
    ChannelMismatch {
        expected: Option<String>,
        received: Option<String>,
    },
}

/// One fully-formed wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub id: CorrelationId,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Envelope {
    fn new(id: CorrelationId, channel: Option<String>, body: MessageBody) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            channel,
            id,
            timestamp_ms: now_ms(),
            body,
        }
    }

    #[must_use]
    pub fn request(
        id: CorrelationId,
        channel: Option<String>,
        method: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::Request {
                method: method.into(),
                payload,
            },
        )
    }

    #[must_use]
    pub fn response_ok(
        id: CorrelationId,
        channel: Option<String>,
        request_id: CorrelationId,
        data: Value,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::Response {
                request_id,
                success: true,
                data: Some(data),
                error: None,
            },
        )
    }

    #[must_use]
    pub fn response_err(
        id: CorrelationId,
        channel: Option<String>,
        request_id: CorrelationId,
        error: ErrorPayload,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::Response {
                request_id,
                success: false,
                data: None,
                error: Some(error),
            },
        )
    }

    #[must_use]
    pub fn handshake_request(
        id: CorrelationId,
        channel: Option<String>,
        advertised_methods: Vec<String>,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::HandshakeRequest { advertised_methods },
        )
    }

    #[must_use]
    pub fn handshake_ack(
        id: CorrelationId,
        channel: Option<String>,
        request_id: CorrelationId,
        advertised_methods: Vec<String>,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::HandshakeAck {
                request_id,
                advertised_methods,
            },
        )
    }

    #[must_use]
    pub fn notification(
        id: CorrelationId,
        channel: Option<String>,
        method: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::new(
            id,
            channel,
            MessageBody::Notification {
                method: method.into(),
                payload,
            },
        )
    }

    /// The single ingestion-boundary parse.
    ///
    /// Order matters: parse, then version gate, then channel gate. Callers
    /// drop on any error; classification failures never propagate further.
    pub fn classify(
        value: Value,
        expected_channel: Option<&str>,
    ) -> Result<Envelope, ClassifyError> {
        let envelope: Envelope = serde_json::from_value(value)?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(ClassifyError::UnsupportedVersion {
                received: envelope.version,
            });
        }
        if envelope.channel.as_deref() != expected_channel {
            return Err(ClassifyError::ChannelMismatch {
                expected: expected_channel.map(str::to_owned),
                received: envelope.channel,
            });
        }
        Ok(envelope)
    }

    /// Serialize for handoff to a transport.
    pub fn into_value(self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
