//! # Delivery Stream
//!
//! `Stream` adapter over an endpoint's inbound queue, for embeddings that
//! want combinators instead of an explicit receive loop.

use bridge_core::Delivery;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A stream of inbound deliveries. Ends when the counterpart endpoint is
/// dropped.
#[derive(Debug)]
pub struct DeliveryStream {
    inbound: mpsc::Receiver<Delivery>,
}

impl DeliveryStream {
    #[must_use]
    pub fn new(inbound: mpsc::Receiver<Delivery>) -> Self {
        Self { inbound }
    }

    /// Unwrap back into the raw receiver (e.g. to hand to `Bridge::spawn`).
    #[must_use]
    pub fn into_inner(self) -> mpsc::Receiver<Delivery> {
        self.inbound
    }
}

impl Stream for DeliveryStream {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inbound.poll_recv(cx)
    }
}
