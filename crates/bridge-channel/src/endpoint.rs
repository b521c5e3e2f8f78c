//! # Channel Endpoints
//!
//! One half of an in-memory pair. Implements the engine's outbound
//! [`Transport`] port and owns the inbound receiver until the application
//! (or `Bridge::spawn`) takes it.

use async_trait::async_trait;
use bridge_core::{Delivery, Transport, TransportError};
use bridge_types::{Envelope, PeerHandle, SenderIdentity};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::stream::DeliveryStream;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Process-wide handle allocator; handles only need to be unique tokens.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn mint_handle() -> PeerHandle {
    PeerHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// One side of an in-memory channel pair.
pub struct ChannelEndpoint {
    identity: SenderIdentity,
    handle: PeerHandle,
    to_peer: mpsc::Sender<Delivery>,
    inbound: Mutex<Option<mpsc::Receiver<Delivery>>>,
}

impl ChannelEndpoint {
    /// This endpoint's claimed identity, stamped on everything it sends.
    #[must_use]
    pub fn identity(&self) -> &SenderIdentity {
        &self.identity
    }

    /// This endpoint's connection handle, as seen by the counterpart.
    #[must_use]
    pub fn handle(&self) -> PeerHandle {
        self.handle
    }

    /// Take the inbound receiver. Yields `Some` exactly once.
    #[must_use]
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<Delivery>> {
        self.inbound.lock().take()
    }

    /// Take the inbound receiver as a [`DeliveryStream`]. Yields `Some`
    /// exactly once, sharing the single receiver with [`take_inbound`].
    ///
    /// [`take_inbound`]: ChannelEndpoint::take_inbound
    #[must_use]
    pub fn delivery_stream(&self) -> Option<DeliveryStream> {
        self.take_inbound().map(DeliveryStream::new)
    }

    /// Push a raw value to the counterpart, stamped as this endpoint.
    ///
    /// This is the escape hatch scripted peers and tests use to inject
    /// arbitrary (including malformed) traffic.
    pub async fn send_raw(&self, payload: Value) -> Result<(), TransportError> {
        let delivery = Delivery {
            payload,
            sender: self.identity.clone(),
            peer: self.handle,
        };
        self.to_peer
            .send(delivery)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Transport for ChannelEndpoint {
    /// The pair is point-to-point, so the destination hint is redundant; it
    /// is accepted and ignored.
    async fn send(
        &self,
        envelope: Envelope,
        _destination: Option<PeerHandle>,
    ) -> Result<(), TransportError> {
        debug!(kind = envelope.body.kind(), id = %envelope.id, "channel send");
        let value = envelope
            .into_value()
            .map_err(|error| TransportError::Codec(error.to_string()))?;
        self.send_raw(value).await
    }
}

impl std::fmt::Debug for ChannelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelEndpoint")
            .field("identity", &self.identity)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Build a connected endpoint pair with the default queue capacity.
#[must_use]
pub fn pair(
    a_identity: impl Into<SenderIdentity>,
    b_identity: impl Into<SenderIdentity>,
) -> (ChannelEndpoint, ChannelEndpoint) {
    pair_with_capacity(a_identity, b_identity, DEFAULT_CHANNEL_CAPACITY)
}

/// Build a connected endpoint pair with an explicit queue capacity.
#[must_use]
pub fn pair_with_capacity(
    a_identity: impl Into<SenderIdentity>,
    b_identity: impl Into<SenderIdentity>,
    capacity: usize,
) -> (ChannelEndpoint, ChannelEndpoint) {
    let (a_to_b, b_from_a) = mpsc::channel(capacity);
    let (b_to_a, a_from_b) = mpsc::channel(capacity);

    let a = ChannelEndpoint {
        identity: a_identity.into(),
        handle: mint_handle(),
        to_peer: a_to_b,
        inbound: Mutex::new(Some(a_from_b)),
    };
    let b = ChannelEndpoint {
        identity: b_identity.into(),
        handle: mint_handle(),
        to_peer: b_to_a,
        inbound: Mutex::new(Some(b_from_a)),
    };
    (a, b)
}
