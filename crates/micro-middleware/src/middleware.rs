//! Handler and middleware traits.
//!
//! Every stage of the pipeline is either a [`Handler`] (produces a response)
//! or a [`Middleware`] (wraps the rest of the chain). A middleware receives
//! the request and a [`Next`] cursor; it may change the request before
//! calling `next.run`, change the response afterwards, return its own
//! response without calling `next` at all, or fail.
//!
//! # Example
//!
//! ```
//! use micro_middleware::{BoxFuture, HandlerResult, Middleware, Next, Request};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(request).await;
//!             tracing::debug!(elapsed = ?start.elapsed(), "request handled");
//!             response
//!         })
//!     }
//! }
//! ```

use micro_core::{BoxFuture, HandlerResult, Request};
use std::future::Future;
use std::sync::Arc;

/// Produces a response for a request.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult>;
}

impl<T: Handler + ?Sized> Handler for Arc<T> {
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        (**self).handle(request)
    }
}

/// Wraps the rest of a chain.
///
/// # Invariants
///
/// - `next.run()` is called at most once (not calling it short-circuits)
/// - A middleware must not swallow downstream failures unless it is the
///   error boundary
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, delegating to `next` to continue the chain.
    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult>;
}

/// Cursor over the remaining middlewares of a chain and its terminal handler.
///
/// Consumed by [`Next::run`], so each cursor continues the chain once.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Creates a cursor at the start of `middlewares`, ending in `handler`.
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    /// Invokes the next middleware, or the handler once none are left.
    pub fn run(self, request: Request) -> BoxFuture<'a, HandlerResult> {
        match self.middlewares.split_first() {
            Some((middleware, rest)) => middleware.process(request, Next::new(rest, self.handler)),
            None => self.handler.handle(request),
        }
    }

    /// Returns the number of middlewares left before the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.middlewares.len()
    }
}

/// A handler created from an async function.
///
/// # Example
///
/// ```
/// use micro_middleware::FnHandler;
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// let handler = FnHandler::new(|_request| async {
///     Ok(http::Response::new(Full::new(Bytes::from("OK"))))
/// });
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Creates a new function-based handler.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self { func }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        Box::pin((self.func)(request))
    }
}

/// A middleware created from a function.
///
/// The function receives the [`Next`] cursor and must return a boxed future
/// borrowing it.
///
/// # Example
///
/// ```
/// use micro_middleware::FnMiddleware;
///
/// let middleware = FnMiddleware::new("passthrough", |request, next| {
///     Box::pin(async move { next.run(request).await })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        (self.func)(request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::{BodyExt, Full};

    fn request() -> Request {
        Request::new(Method::GET, "/test".parse().unwrap())
    }

    async fn body_string(response: micro_core::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
            Box::pin(self.tag(request, next))
        }
    }

    impl Tag {
        async fn tag(&self, request: Request, next: Next<'_>) -> HandlerResult {
            let mut response = next.run(request).await?;
            response
                .headers_mut()
                .append("x-tag", http::HeaderValue::from_static(self.0));
            Ok(response)
        }
    }

    fn respond(status: StatusCode, body: &'static str) -> HandlerResult {
        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        Ok(response)
    }

    #[derive(Default)]
    struct Ok200 {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Handler for Ok200 {
        fn handle(&self, _request: Request) -> BoxFuture<'_, HandlerResult> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async { respond(StatusCode::OK, "OK") })
        }
    }

    fn ok_handler() -> Ok200 {
        Ok200::default()
    }

    #[tokio::test]
    async fn test_middleware_name() {
        assert_eq!(Tag("test").name(), "test");
    }

    #[tokio::test]
    async fn test_next_without_middlewares_calls_handler() {
        let handler = ok_handler();
        let middlewares: Vec<Arc<dyn Middleware>> = Vec::new();
        let next = Next::new(&middlewares, &handler);
        assert_eq!(next.remaining(), 0);

        let response = next.run(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn test_next_runs_middlewares_outermost_first() {
        let handler = ok_handler();
        let middlewares: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(Tag("first")), Arc::new(Tag("second"))];

        let response = Next::new(&middlewares, &handler).run(request()).await.unwrap();

        // Headers are appended on the way out, so the innermost tag comes first.
        let tags: Vec<_> = response
            .headers()
            .get_all("x-tag")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuit() {
        let handler = ok_handler();
        let middleware = FnMiddleware::new("deny", |_request, _next| {
            Box::pin(async { respond(StatusCode::FORBIDDEN, "") })
        });
        let middlewares: Vec<Arc<dyn Middleware>> = vec![Arc::new(middleware)];

        let response = Next::new(&middlewares, &handler).run(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(handler.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = FnHandler::new(|request: Request| async move {
            Ok(http::Response::new(Full::new(Bytes::from(request.path().to_string()))))
        });
        let response = handler.handle(request()).await.unwrap();
        assert_eq!(body_string(response).await, "/test");
    }

    #[tokio::test]
    async fn test_arc_handler_delegates() {
        let handler: Arc<dyn Handler> = Arc::new(ok_handler());
        let response = handler.handle(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
