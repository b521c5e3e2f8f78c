//! # Bridge Facade
//!
//! Composes the trust gate, classifier, correlation table, state machine,
//! handshake coordination, retry executor, and request router into the one
//! object an application holds. Both participants run an identical instance;
//! the initiator and responder roles are symmetric.
//!
//! ## Inbound Pump
//!
//! One spawned task per bridge consumes the transport's delivery queue and
//! performs all inbound state transitions:
//!
//! ```text
//! delivery ──→ trust gate ──→ classify ──→ ┬ request       → router task
//!              (silent drop)  (silent drop) ├ response      → correlation
//!                                           ├ hs-request    → ack + connect
//!                                           ├ hs-ack        → settle attempt
//!                                           └ notification  → handler task
//! ```
//!
//! Handler invocations run on independent tasks, so responses for distinct
//! requests may be produced out of arrival order; the caller side matches
//! strictly by correlation id.

use crate::config::{BridgeConfig, CallOptions};
use crate::domain::correlation::{CorrelationTable, IdSource};
use crate::domain::state::{ConnectAdmission, ConnectionState, StateCell};
use crate::domain::trust::TrustGate;
use crate::ports::{Delivery, Transport};
use crate::registry::MethodRegistry;
use crate::router::RequestRouter;
use bridge_types::{
    BridgeError, CorrelationId, Envelope, ErrorPayload, MessageBody, PeerHandle, SenderIdentity,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Pseudo-method name used for handshake entries in the correlation table.
const HANDSHAKE_METHOD: &str = "__handshake__";

/// The counterpart recorded at handshake time.
#[derive(Debug, Clone)]
pub struct PeerLink {
    /// The counterpart's sender identity, as asserted by the transport.
    pub identity: SenderIdentity,
    /// The concrete connection the counterpart speaks through.
    pub peer: PeerHandle,
    /// The method names the counterpart advertised.
    pub methods: Vec<String>,
}

/// A correlated RPC endpoint over one transport.
pub struct Bridge<T: Transport> {
    config: BridgeConfig,
    state: StateCell,
    correlation: CorrelationTable,
    trust: TrustGate,
    registry: Arc<MethodRegistry>,
    router: Arc<RequestRouter>,
    ids: Arc<IdSource>,
    transport: Arc<T>,
    link: Mutex<Option<PeerLink>>,
    /// Correlation id of the currently outstanding handshake attempt.
    /// An ack referencing any other id is ignored outright.
    outstanding_handshake: Mutex<Option<CorrelationId>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport> Bridge<T> {
    /// Compose a bridge and start its inbound pump.
    pub fn spawn(
        config: BridgeConfig,
        registry: MethodRegistry,
        transport: Arc<T>,
        mut inbound: mpsc::Receiver<Delivery>,
    ) -> Arc<Self> {
        let registry = Arc::new(registry);
        let ids = Arc::new(IdSource::new());
        let router = Arc::new(RequestRouter::new(
            registry.clone(),
            config.channel.clone(),
            ids.clone(),
        ));

        let bridge = Arc::new(Self {
            state: StateCell::new(),
            correlation: CorrelationTable::new(),
            trust: TrustGate::new(config.trust.clone()),
            registry,
            router,
            ids,
            transport,
            link: Mutex::new(None),
            outstanding_handshake: Mutex::new(None),
            pump: Mutex::new(None),
            config,
        });

        let pump = tokio::spawn({
            let bridge = bridge.clone();
            async move {
                while let Some(delivery) = inbound.recv().await {
                    if bridge.state.is_destroyed() {
                        break;
                    }
                    bridge.ingest(delivery).await;
                }
            }
        });
        *bridge.pump.lock() = Some(pump);

        bridge
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Establish the connection by handshaking with the counterpart.
    ///
    /// Idempotent while connected; rejected while another `connect()` is in
    /// flight. Retries up to the configured attempt count with a fixed
    /// inter-attempt delay, each attempt under a fresh correlation id that
    /// supersedes the previous one.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        match self.state.begin_connect()? {
            ConnectAdmission::AlreadyConnected => return Ok(()),
            ConnectAdmission::Begin => {}
        }

        let attempts = self.config.handshake_attempts.max(1);
        let mut last_failure: Option<BridgeError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                sleep(self.config.handshake_retry_delay).await;
                if self.state.is_destroyed() {
                    return Err(BridgeError::Destroyed);
                }
                // The counterpart may have handshaked us meanwhile.
                if self.state.is_connected() {
                    return Ok(());
                }
            }

            match self.handshake_attempt().await {
                Ok(()) => return Ok(()),
                Err(BridgeError::Destroyed) => return Err(BridgeError::Destroyed),
                Err(error) => {
                    debug!(attempt, error = %error, "handshake attempt failed");
                    last_failure = Some(error);
                }
            }
        }

        self.outstanding_handshake.lock().take();
        self.state.revert_connecting();
        Err(BridgeError::HandshakeFailed {
            attempts,
            reason: "no acknowledgment from counterpart".into(),
            cause: last_failure.map(Box::new),
        })
    }

    /// One handshake attempt: fresh id, advertise local methods, await the
    /// matching ack. The pump completes the transition on a valid ack.
    async fn handshake_attempt(&self) -> Result<(), BridgeError> {
        let id = self.ids.mint();
        let rx = self.correlation.register(id.clone(), HANDSHAKE_METHOD);
        *self.outstanding_handshake.lock() = Some(id.clone());

        let envelope = Envelope::handshake_request(
            id.clone(),
            self.config.channel.clone(),
            self.registry.method_names(),
        );
        if let Err(error) = self.transport.send(envelope, None).await {
            self.correlation.abandon(&id);
            return Err(BridgeError::Unknown(format!(
                "handshake send failed: {error}"
            )));
        }

        let deadline = self.config.handshake_timeout;
        match timeout(deadline, rx).await {
            Ok(Ok(outcome)) => outcome.map(|_| ()),
            Ok(Err(_closed)) => Err(BridgeError::Destroyed),
            Err(_elapsed) => {
                self.correlation.abandon(&id);
                Err(BridgeError::Timeout {
                    method: HANDSHAKE_METHOD.into(),
                    timeout_ms: deadline.as_millis() as u64,
                })
            }
        }
    }

    /// Tear the bridge down: synchronous for all local state, idempotent,
    /// never fails.
    ///
    /// Every pending call rejects with `DESTROYED`. A request already handed
    /// to the transport cannot be retracted; its late response will find no
    /// matching entry and be discarded.
    pub fn destroy(&self) {
        if !self.state.destroy() {
            return;
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        self.outstanding_handshake.lock().take();
        self.link.lock().take();
        self.correlation.drain(&BridgeError::Destroyed);
        debug!("bridge destroyed");
    }

    // =========================================================================
    // CALLER ROLE
    // =========================================================================

    /// Call a method on the counterpart with the bridge's default options.
    pub async fn invoke(&self, method: &str, payload: Value) -> Result<Value, BridgeError> {
        self.invoke_with(method, payload, CallOptions::default()).await
    }

    /// Call a method on the counterpart with per-call overrides.
    pub async fn invoke_with(
        &self,
        method: &str,
        payload: Value,
        options: CallOptions,
    ) -> Result<Value, BridgeError> {
        // Not connected rejects immediately: no attempt, no retry.
        self.state.require_connected()?;

        let call_timeout = options.timeout.unwrap_or(self.config.call_timeout);
        let retry = options.retry.unwrap_or_else(|| self.config.retry.clone());
        let attempts = retry.attempts();

        if attempts <= 1 {
            return self.attempt_call(method, payload, call_timeout).await;
        }

        let mut attempt = 0u32;
        loop {
            match self.attempt_call(method, payload.clone(), call_timeout).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let exhausted = attempt + 1 >= attempts;
                    if exhausted || !retry.should_retry(&error) {
                        return Err(error);
                    }
                    let delay = retry.delay_for(attempt);
                    debug!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying call"
                    );
                    sleep(delay).await;
                    if self.state.is_destroyed() {
                        return Err(BridgeError::Destroyed);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Statically-typed convenience facade over [`Bridge::invoke`].
    pub async fn invoke_typed<P, R>(&self, method: &str, params: &P) -> Result<R, BridgeError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(params)
            .map_err(|error| BridgeError::Unknown(format!("parameter encoding failed: {error}")))?;
        let value = self.invoke(method, payload).await?;
        serde_json::from_value(value)
            .map_err(|error| BridgeError::Unknown(format!("response decoding failed: {error}")))
    }

    /// Fire-and-forget: no correlation id, no response, no retry.
    pub async fn notify(&self, method: &str, payload: Value) -> Result<(), BridgeError> {
        self.state.require_connected()?;
        let destination = self.link.lock().as_ref().map(|link| link.peer);
        let envelope = Envelope::notification(
            self.ids.mint(),
            self.config.channel.clone(),
            method,
            payload,
        );
        self.transport
            .send(envelope, destination)
            .await
            .map_err(|error| BridgeError::Unknown(format!("send failed: {error}")))
    }

    /// One request/response cycle: register, send, await settlement.
    async fn attempt_call(
        &self,
        method: &str,
        payload: Value,
        call_timeout: Duration,
    ) -> Result<Value, BridgeError> {
        self.state.require_connected()?;

        let destination = self.link.lock().as_ref().map(|link| link.peer);
        let id = self.ids.mint();
        let rx = self.correlation.register(id.clone(), method);

        let envelope = Envelope::request(id.clone(), self.config.channel.clone(), method, payload);
        if let Err(error) = self.transport.send(envelope, destination).await {
            self.correlation.abandon(&id);
            return Err(BridgeError::Unknown(format!("send failed: {error}")));
        }

        match timeout(call_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_closed)) => Err(BridgeError::Destroyed),
            Err(_elapsed) => {
                self.correlation.abandon(&id);
                Err(BridgeError::Timeout {
                    method: method.into(),
                    timeout_ms: call_timeout.as_millis() as u64,
                })
            }
        }
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.current()
    }

    /// The method names the counterpart advertised, once connected.
    #[must_use]
    pub fn peer_methods(&self) -> Option<Vec<String>> {
        self.link.lock().as_ref().map(|link| link.methods.clone())
    }

    /// Number of calls currently awaiting settlement.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.correlation.len()
    }

    // =========================================================================
    // INBOUND PATH
    // =========================================================================

    /// Process one delivery: trust gate, classify, dispatch. Every rejection
    /// is a silent drop; nothing on this path ever answers an untrusted or
    /// malformed message.
    async fn ingest(&self, delivery: Delivery) {
        let Delivery {
            payload,
            sender,
            peer,
        } = delivery;

        let pinned = self.link.lock().clone();
        let pinned_ref = pinned.as_ref().map(|link| (&link.identity, link.peer));
        if let Err(reason) = self.trust.admit(&sender, peer, pinned_ref) {
            if self.config.debug {
                debug!(sender = %sender, %peer, %reason, "inbound message dropped by trust gate");
            }
            return;
        }

        let envelope = match Envelope::classify(payload, self.config.channel.as_deref()) {
            Ok(envelope) => envelope,
            Err(error) => {
                if self.config.debug {
                    debug!(sender = %sender, error = %error, "inbound message dropped at classification");
                }
                return;
            }
        };

        match envelope.body {
            MessageBody::Request { method, payload } => {
                self.on_request(envelope.id, method, payload, peer);
            }
            MessageBody::Response {
                request_id,
                success,
                data,
                error,
            } => self.on_response(&request_id, success, data, error),
            MessageBody::HandshakeRequest { advertised_methods } => {
                self.on_handshake_request(envelope.id, sender, peer, advertised_methods)
                    .await;
            }
            MessageBody::HandshakeAck {
                request_id,
                advertised_methods,
            } => self.on_handshake_ack(&request_id, sender, peer, advertised_methods),
            MessageBody::Notification { method, payload } => {
                self.on_notification(method, payload);
            }
        }
    }

    fn on_request(
        &self,
        request_id: CorrelationId,
        method: String,
        payload: Value,
        peer: PeerHandle,
    ) {
        if !self.state.is_connected() {
            if self.config.debug {
                debug!(%request_id, %method, "request before connection established dropped");
            }
            return;
        }
        let router = self.router.clone();
        let transport = self.transport.clone();
        // Independent task per request: responses may outrun arrival order.
        tokio::spawn(async move {
            let response = router.respond(request_id, &method, payload).await;
            if let Err(error) = transport.send(response, Some(peer)).await {
                debug!(%method, error = %error, "response send failed");
            }
        });
    }

    fn on_response(
        &self,
        request_id: &CorrelationId,
        success: bool,
        data: Option<Value>,
        error: Option<ErrorPayload>,
    ) {
        let outcome = if success {
            Ok(data.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::from_wire(
                error.unwrap_or_else(ErrorPayload::missing),
            ))
        };
        // Absent id is a legitimate race (late arrival after timeout);
        // settle logs and no-ops.
        self.correlation.settle(request_id, outcome);
    }

    /// Responder role: honored at any time, including while already
    /// connected, so a reloading initiator can re-handshake.
    async fn on_handshake_request(
        &self,
        request_id: CorrelationId,
        sender: SenderIdentity,
        peer: PeerHandle,
        advertised_methods: Vec<String>,
    ) {
        if self.state.is_destroyed() {
            return;
        }
        *self.link.lock() = Some(PeerLink {
            identity: sender.clone(),
            peer,
            methods: advertised_methods,
        });
        if !self.state.mark_connected() {
            return;
        }
        debug!(sender = %sender, "handshake request accepted");

        let ack = Envelope::handshake_ack(
            self.ids.mint(),
            self.config.channel.clone(),
            request_id,
            self.registry.method_names(),
        );
        if let Err(error) = self.transport.send(ack, Some(peer)).await {
            debug!(error = %error, "handshake ack send failed");
        }
    }

    /// Initiator role: only the ack matching the outstanding attempt counts;
    /// a stale ack from a superseded attempt is ignored outright.
    fn on_handshake_ack(
        &self,
        request_id: &CorrelationId,
        sender: SenderIdentity,
        peer: PeerHandle,
        advertised_methods: Vec<String>,
    ) {
        {
            let mut outstanding = self.outstanding_handshake.lock();
            if outstanding.as_ref() != Some(request_id) {
                if self.config.debug {
                    debug!(%request_id, "handshake ack for superseded attempt ignored");
                }
                return;
            }
            outstanding.take();
        }

        *self.link.lock() = Some(PeerLink {
            identity: sender,
            peer,
            methods: advertised_methods,
        });
        if !self.state.mark_connected() {
            return;
        }
        self.correlation.settle(request_id, Ok(Value::Null));
    }

    fn on_notification(&self, method: String, payload: Value) {
        if !self.state.is_connected() {
            if self.config.debug {
                debug!(%method, "notification before connection established dropped");
            }
            return;
        }
        let router = self.router.clone();
        tokio::spawn(async move {
            router.deliver_notification(&method, payload).await;
        });
    }
}
