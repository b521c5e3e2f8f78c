//! # Context-Bridge Test Suite
//!
//! Unified test crate exercising the protocol engine end-to-end over the
//! in-memory channel transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Fixtures: bridge pairs, scripted peers, registries
//! │
//! └── integration/      # End-to-end protocol scenarios
//!     ├── round_trip.rs # Handshake + call/response/notify happy paths
//!     ├── resilience.rs # Timeouts, retries, destruction, stale acks
//!     └── security.rs   # Trust gate, counterpart pinning, malformed traffic
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bridge-tests
//!
//! # By category
//! cargo test -p bridge-tests integration::round_trip
//! cargo test -p bridge-tests integration::resilience
//! cargo test -p bridge-tests integration::security
//! ```

#![allow(dead_code)]

pub mod integration;
