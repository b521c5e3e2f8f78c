//! # Bridge Channel - In-Memory Paired Transport
//!
//! The reference [`Transport`] implementation: two endpoints joined by
//! in-process queues, one per direction.
//!
//! ```text
//! ┌──────────────┐   send()                      ┌──────────────┐
//! │  Endpoint A  │ ────────────────────────────→ │  Endpoint B  │
//! │ (app://host) │ ←──────────────────────────── │ (app://child)│
//! └──────────────┘                      send()   └──────────────┘
//! ```
//!
//! Each delivery is stamped with the *sending* endpoint's identity and
//! handle, mirroring how a real transport asserts sender metadata out of
//! band. Payloads cross as raw `serde_json::Value`s, so the receiving
//! engine's classification boundary does real work — and tests can inject
//! arbitrary garbage with [`ChannelEndpoint::send_raw`].
//!
//! Suitable for same-process embedding and for the test suite; it makes no
//! delivery guarantees beyond what an unbounded-latency queue provides, and
//! the engine is expected to treat it as unreliable.

pub mod endpoint;
pub mod stream;

pub use endpoint::{pair, pair_with_capacity, ChannelEndpoint};
pub use stream::DeliveryStream;

/// Queue depth per direction before senders are backpressured.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
