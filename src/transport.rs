//! The capabilities a transport offers: registering POST handlers on the
//! server side and issuing POST requests on the client side.

use crate::error::{SetupError, TransportError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

/// `{prefix}/{interface}/{procedure}`
pub fn route(prefix: &str, interface: &str, procedure: &str) -> String {
    format!("{prefix}/{interface}/{procedure}")
}

/// Status and body of an answered request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The request itself was rejected; sending it again cannot help.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub(crate) fn detail(status: u16, detail: impl fmt::Display) -> Self {
        let body = serde_json::json!({ "detail": detail.to_string() });
        Self::new(status, body.to_string().into_bytes())
    }

    /// The `detail` message of an error reply, if it has one.
    pub fn detail_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        value.get("detail")?.as_str().map(str::to_owned)
    }
}

pub type SyncHandler = Arc<dyn Fn(&[u8]) -> Reply + Send + Sync>;
pub type AsyncHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Reply> + Send + Sync>;

/// A request handler in the form matching its procedure's calling convention.
#[derive(Clone)]
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl Handler {
    pub async fn handle(&self, body: Vec<u8>) -> Reply {
        match self {
            Handler::Sync(f) => f(body.as_slice()),
            Handler::Async(f) => f(body).await,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Handler::Sync(_) => "Handler::Sync",
            Handler::Async(_) => "Handler::Async",
        })
    }
}

/// Server-side capability: "register a handler for POST + path".
pub trait Router {
    fn post(&mut self, path: String, handler: Handler) -> Result<(), SetupError>;

    /// Whether a handler is already registered for `path`.
    fn contains(&self, path: &str) -> bool;
}

/// An in-memory [`Router`] that also answers requests by path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, Handler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn handler(&self, path: &str) -> Option<&Handler> {
        self.routes.get(path)
    }

    pub async fn handle(&self, path: &str, body: Vec<u8>) -> Reply {
        match self.routes.get(path) {
            Some(handler) => handler.handle(body).await,
            None => Reply::detail(404, format!("no route for `{path}`")),
        }
    }
}

impl Router for RouteTable {
    fn post(&mut self, path: String, handler: Handler) -> Result<(), SetupError> {
        if self.contains(&path) {
            return Err(SetupError::DuplicateRoute(path));
        }
        tracing::debug!(%path, ?handler, "registered route");
        self.routes.insert(path, handler);
        Ok(())
    }

    fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }
}

/// Client-side capability: "POST a body to a path within a timeout".
pub trait Transport: Send + Sync {
    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Reply, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Reply, TransportError>> {
        (**self).post(path, body, timeout)
    }
}

/// In-process transport answering from a shared [`RouteTable`].
#[derive(Debug, Clone)]
pub struct Loopback {
    routes: Arc<RouteTable>,
}

impl Loopback {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

impl Transport for Loopback {
    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Reply, TransportError>> {
        Box::pin(async move {
            tokio::time::timeout(timeout, self.routes.handle(path, body))
                .await
                .map_err(|_| TransportError::Timeout)
        })
    }
}
