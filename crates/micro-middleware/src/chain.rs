//! Order-preserving middleware composition.
//!
//! A [`MiddlewareChainHandler`] turns a terminal handler and a sequence of
//! middlewares into a single [`Handler`]:
//!
//! ```text
//! request → M1 → M2 → … → Mn → H
//!                              ↓
//! response ← M1 ← M2 ← … ← Mn ←┘
//! ```

use crate::middleware::{Handler, Middleware, Next};
use micro_core::{BoxFuture, HandlerResult, Request};
use std::fmt;
use std::sync::Arc;

/// A handler running a fixed list of middlewares before a terminal handler.
///
/// The middleware sequence is materialized once at construction, so the
/// composed handler can be invoked any number of times, concurrently, and
/// always runs the same middlewares in the same order.
///
/// # Example
///
/// ```
/// use micro_middleware::{FnHandler, FnMiddleware, Handler, Middleware, MiddlewareChainHandler, Request};
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use std::sync::Arc;
///
/// let handler = FnHandler::new(|_request| async {
///     Ok(http::Response::new(Full::new(Bytes::from("OK"))))
/// });
/// let passthrough: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("passthrough", |request, next| {
///     Box::pin(async move { next.run(request).await })
/// }));
///
/// let chain = MiddlewareChainHandler::new(handler, [passthrough]);
/// assert_eq!(chain.names(), vec!["passthrough"]);
/// ```
#[derive(Clone)]
pub struct MiddlewareChainHandler {
    handler: Arc<dyn Handler>,
    middlewares: Arc<[Arc<dyn Middleware>]>,
}

impl MiddlewareChainHandler {
    /// Creates a chain running `middlewares` in iteration order, then `handler`.
    pub fn new<H, I>(handler: H, middlewares: I) -> Self
    where
        H: Handler,
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        Self {
            handler: Arc::new(handler),
            middlewares: middlewares.into_iter().collect(),
        }
    }

    /// Returns the number of middlewares in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain has no middlewares.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the middleware names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}

impl Handler for MiddlewareChainHandler {
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        Next::new(&self.middlewares, self.handler.as_ref()).run(request)
    }
}

impl fmt::Debug for MiddlewareChainHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChainHandler")
            .field("middlewares", &self.names())
            .finish_non_exhaustive()
    }
}
