//! # Bridge Core - Correlated RPC Protocol Engine
//!
//! Turns "fire a message, maybe get a reply, maybe never" into "await a typed
//! result, or a typed failure, within a bounded time" between two isolated
//! execution contexts joined only by an unreliable, unordered message channel.
//!
//! ## Architecture
//!
//! ```text
//!  outbound:  invoke() ──→ [Retry Executor] ──→ [Call Dispatcher]
//!                                                  │ register
//!                                                  ▼
//!                                          [Correlation Table] ──→ transport
//!
//!  inbound:   transport ──→ [Trust Gate] ──→ [Classifier]
//!                                                  │
//!                     ┌────────────────────────────┼──────────────────┐
//!                     ▼                            ▼                  ▼
//!             [Correlation Table]          [Request Router]   notification
//!             (responses, acks)            (local handlers)     handler
//! ```
//!
//! Both participants run an identical [`Bridge`] instance; the initiator and
//! responder roles are symmetric, not separate components.
//!
//! ## Guarantees (and non-guarantees)
//!
//! - Every dispatched call settles exactly once: response, timeout, retry
//!   exhaustion, or destruction, whichever happens first.
//! - No delivery, ordering, or exactly-once guarantee at the transport level;
//!   loss and reordering are tolerated purely through timeouts.
//! - Untrusted senders are dropped silently: they can neither observe whether
//!   a message was processed nor raise an error in the receiving side.

pub mod config;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod router;
pub mod service;

pub use config::{BridgeConfig, CallOptions};
pub use domain::correlation::IdSource;
pub use domain::retry::RetryPolicy;
pub use domain::state::ConnectionState;
pub use domain::trust::TrustPolicy;
pub use ports::{Delivery, Transport, TransportError};
pub use registry::{HandlerFailure, HandlerResult, MethodRegistry, MethodRegistryBuilder};
pub use service::{Bridge, PeerLink};
