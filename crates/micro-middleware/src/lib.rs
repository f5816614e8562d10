//! # Micro Middleware
//!
//! Middleware chain, routing stages and controller dispatch for the Micro
//! runtime.
//!
//! ## Pipeline
//!
//! ```text
//! Request → Error → global middlewares → (Match) → Route → Dispatch
//!                                                             ↓
//!                               route middlewares → ControllerInvoker → Controller
//! ```
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | Error | [`ErrorStage`] | Catches every failure and renders a JSON error response |
//! | Match | [`MatchStage`] | Attaches a [`RouteMatcher`]'s result (optional) |
//! | Route | [`RouteStage`] | 404 / 405 / resolves the matched [`Route`](micro_core::Route) |
//! | Dispatch | [`ControllerDispatchStage`] | Runs the route's middlewares and the controller |
//!
//! Stages and application middlewares share the [`Middleware`] trait and are
//! composed with [`MiddlewareChainHandler`], which runs them in the order
//! given, outermost first.
//!
//! ## Example
//!
//! ```
//! use micro_middleware::{FnHandler, FnMiddleware, Handler, Middleware, MiddlewareChainHandler};
//! use micro_core::Request;
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let handler = FnHandler::new(|_request| async {
//!     Ok(http::Response::new(Full::new(Bytes::from("OK"))))
//! });
//! let audit: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("audit", |request, next| {
//!     Box::pin(async move {
//!         tracing::info!(path = request.path(), "audit");
//!         next.run(request).await
//!     })
//! }));
//!
//! let chain = MiddlewareChainHandler::new(handler, [audit]);
//! let response = chain
//!     .handle(Request::new(http::Method::GET, "/".parse().unwrap()))
//!     .await
//!     .unwrap();
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/micro-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod binding;
pub mod chain;
pub mod dispatch;
pub mod events;
pub mod invoker;
pub mod middleware;
pub mod registry;
pub mod stages;

// Re-export main types at crate root
pub use binding::{
    BindingScope, ContainerBinder, ParameterBinder, RequestBinder, RouteArgumentBinder,
};
pub use chain::MiddlewareChainHandler;
pub use dispatch::ControllerDispatchStage;
pub use events::{ErrorDispatcher, ErrorListener, ERROR_EVENT};
pub use invoker::ControllerInvoker;
pub use middleware::{FnHandler, FnMiddleware, Handler, Middleware, Next};
pub use micro_core::{BoxFuture, HandlerResult, Request, Response};
pub use registry::{MiddlewareContainerExt, MiddlewareRegistry};
pub use stages::{ErrorStage, MatchStage, RouteMatcher, RouteStage};
