//! # Request Router
//!
//! The responder role: resolves inbound requests to local handlers and
//! produces responses. Every request that reaches the router yields exactly
//! one response — unknown method, handler success, and handler failure all
//! have a response shape — so a handler can neither crash the bridge nor
//! leave the caller hanging.
//!
//! The fire-and-forget path uses the same lookup but has no response path at
//! all: failures are logged and swallowed.

use crate::domain::correlation::IdSource;
use crate::registry::MethodRegistry;
use bridge_types::{CorrelationId, Envelope, ErrorPayload};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Resolves inbound requests against the local registry.
#[derive(Debug)]
pub struct RequestRouter {
    registry: Arc<MethodRegistry>,
    channel: Option<String>,
    ids: Arc<IdSource>,
}

impl RequestRouter {
    #[must_use]
    pub fn new(
        registry: Arc<MethodRegistry>,
        channel: Option<String>,
        ids: Arc<IdSource>,
    ) -> Self {
        Self {
            registry,
            channel,
            ids,
        }
    }

    /// Serve one inbound request, always yielding exactly one response.
    pub async fn respond(
        &self,
        request_id: CorrelationId,
        method: &str,
        payload: Value,
    ) -> Envelope {
        match self.registry.invoke(method, payload).await {
            None => {
                debug!(method, "request for unknown method");
                Envelope::response_err(
                    self.ids.mint(),
                    self.channel.clone(),
                    request_id,
                    ErrorPayload::method_not_found(method),
                )
            }
            Some(Ok(data)) => {
                Envelope::response_ok(self.ids.mint(), self.channel.clone(), request_id, data)
            }
            Some(Err(failure)) => {
                debug!(method, error = %failure, "handler failed");
                Envelope::response_err(
                    self.ids.mint(),
                    self.channel.clone(),
                    request_id,
                    ErrorPayload::handler_error(method, &failure.message, failure.details),
                )
            }
        }
    }

    /// Serve one notification: same lookup, no response path.
    pub async fn deliver_notification(&self, method: &str, payload: Value) {
        match self.registry.invoke(method, payload).await {
            None => debug!(method, "notification for unknown method dropped"),
            Some(Ok(_)) => {}
            Some(Err(failure)) => {
                debug!(method, error = %failure, "notification handler failed")
            }
        }
    }
}
