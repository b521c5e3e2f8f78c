//! # Correlation Table
//!
//! Owns the map of in-flight calls keyed by correlation id and guarantees
//! each entry settles exactly once.
//!
//! ## Settlement
//!
//! A registered entry is destroyed by exactly one of:
//! - [`CorrelationTable::settle`] - a matching response arrived;
//! - [`CorrelationTable::abandon`] - the awaiting caller's deadline elapsed;
//! - [`CorrelationTable::drain`] - the bridge was destroyed.
//!
//! The oneshot sender is consumed together with the entry, so a second
//! settlement of the same id is structurally impossible. A response for an
//! absent id (late arrival after a timeout, or an id this bridge never owned)
//! is a legitimate race: it is logged and ignored, never an error.

use bridge_types::{BridgeError, CorrelationId};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

/// Terminal result of one correlated call.
pub type Outcome = Result<Value, BridgeError>;

/// Bookkeeping held while awaiting the response to one outstanding request.
#[derive(Debug)]
struct PendingCall {
    method: String,
    created_at: Instant,
    tx: oneshot::Sender<Outcome>,
}

/// The map of in-flight calls. Exclusively owned by one bridge instance.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pending call and hand back the receiver its settlement will
    /// arrive on.
    pub fn register(
        &self,
        id: CorrelationId,
        method: impl Into<String>,
    ) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        let pending = PendingCall {
            method: method.into(),
            created_at: Instant::now(),
            tx,
        };
        let previous = self.entries.lock().insert(id, pending);
        // Ids come from an instance-owned source and are never reused.
        debug_assert!(previous.is_none(), "correlation id reused");
        rx
    }

    /// Settle the entry for `id`. Returns false if no such entry is live.
    pub fn settle(&self, id: &CorrelationId, outcome: Outcome) -> bool {
        let Some(pending) = self.entries.lock().remove(id) else {
            debug!(%id, "settlement for unknown or already-settled call ignored");
            return false;
        };
        debug!(
            %id,
            method = %pending.method,
            elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
            "call settled"
        );
        // The receiver may already be gone if the caller's deadline elapsed
        // in the same instant; that caller has its outcome either way.
        let _ = pending.tx.send(outcome);
        true
    }

    /// Remove an entry without settling it; used by the caller that already
    /// rejected locally on timeout.
    pub fn abandon(&self, id: &CorrelationId) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    /// Reject every live entry with `error` and empty the map. Used only by
    /// destruction.
    pub fn drain(&self, error: &BridgeError) {
        let drained: Vec<(CorrelationId, PendingCall)> =
            self.entries.lock().drain().collect();
        for (id, pending) in drained {
            debug!(%id, method = %pending.method, "pending call drained");
            let _ = pending.tx.send(Err(error.clone()));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Instance-owned correlation id source.
///
/// A short random tag isolates concurrently-living bridges from each other;
/// a monotonic counter makes ids unique (and test runs reproducible) within
/// one instance. Never global, never shared.
#[derive(Debug)]
pub struct IdSource {
    tag: String,
    counter: AtomicU64,
}

impl IdSource {
    #[must_use]
    pub fn new() -> Self {
        let mut tag = Uuid::new_v4().simple().to_string();
        tag.truncate(8);
        Self {
            tag,
            counter: AtomicU64::new(0),
        }
    }

    /// Mint a fresh id; never reused by this instance.
    #[must_use]
    pub fn mint(&self) -> CorrelationId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        CorrelationId::new(format!("{}-{}", self.tag, seq))
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}
