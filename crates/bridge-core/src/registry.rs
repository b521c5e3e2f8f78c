//! # Method Registry
//!
//! Immutable-after-construction mapping from method name to handler. The
//! builder consumes itself so a registry can never change under a live
//! bridge; a partial subset of a declared contract is legal.
//!
//! Sync and async registration both funnel into one boxed async invocation
//! point: past [`MethodRegistry::invoke`], everything is asynchronous.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A failure a handler chooses to report.
///
/// Converted by the request router into a `HANDLER_ERROR` response; handlers
/// cannot crash the bridge or leave the caller hanging.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerFailure {
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&str> for HandlerFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// What every handler produces.
pub type HandlerResult = Result<Value, HandlerFailure>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
type BoxedHandler = Box<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Accumulates handlers, then freezes into a [`MethodRegistry`].
#[derive(Default)]
pub struct MethodRegistryBuilder {
    handlers: HashMap<String, BoxedHandler>,
}

impl MethodRegistryBuilder {
    /// Register an async handler.
    #[must_use]
    pub fn method<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let boxed: BoxedHandler =
            Box::new(move |payload| -> HandlerFuture { Box::pin(handler(payload)) });
        self.handlers.insert(name.into(), boxed);
        self
    }

    /// Register a synchronous handler; normalized to the async invocation
    /// point like everything else.
    #[must_use]
    pub fn method_sync<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.method(name, move |payload| std::future::ready(handler(payload)))
    }

    #[must_use]
    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            handlers: self.handlers,
        }
    }
}

/// The frozen name → handler mapping, one per role.
#[derive(Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl MethodRegistry {
    #[must_use]
    pub fn builder() -> MethodRegistryBuilder {
        MethodRegistryBuilder::default()
    }

    /// A registry exposing nothing; a pure caller role.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// The names advertised during the handshake.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke the handler for `name`. `None` if no such handler exists.
    pub(crate) async fn invoke(&self, name: &str, payload: Value) -> Option<HandlerResult> {
        let handler = self.handlers.get(name)?;
        Some(handler(payload).await)
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}
