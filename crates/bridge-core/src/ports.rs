//! Outbound port (SPI) and inbound delivery shape for transport adapters.
//!
//! The engine places exactly two requirements on a transport: a `send`
//! primitive, and an inbound mpsc stream of [`Delivery`] values. Delivery is
//! neither reliable nor ordered; messages may be dropped or reordered, and
//! the engine tolerates this purely through timeouts.

use async_trait::async_trait;
use bridge_types::{Envelope, PeerHandle, SenderIdentity};
use serde_json::Value;
use thiserror::Error;

/// Failures raised by a transport adapter's send path.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The counterpart side of the channel is gone.
    #[error("transport closed")]
    Closed,

    /// The envelope could not be encoded for the wire.
    #[error("message encoding failed: {0}")]
    Codec(String),
}

/// One raw inbound message as surfaced by a transport adapter.
///
/// `payload` is untyped on purpose: classification into an [`Envelope`]
/// happens inside the engine, after the trust gate, so a hostile peer cannot
/// make a malformed value do anything but get dropped.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The raw wire value.
    pub payload: Value,
    /// The sender's claimed identity, asserted by the transport.
    pub sender: SenderIdentity,
    /// The concrete connection the message arrived through.
    pub peer: PeerHandle,
}

/// Hands a message to the counterpart context.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `envelope`, optionally to a specific counterpart connection.
    /// `None` means the adapter's default destination (used before a
    /// handshake has pinned one).
    async fn send(
        &self,
        envelope: Envelope,
        destination: Option<PeerHandle>,
    ) -> Result<(), TransportError>;
}
