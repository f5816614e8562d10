//! # Micro
//!
//! **A minimal HTTP application kernel.**
//!
//! Micro takes a request that already carries a route-matching result and
//! turns it into a response:
//!
//! - **Routing outcome** – 404 and 405 results become error responses, matched
//!   routes are resolved to a controller and its middlewares
//! - **Middleware chains** – a global chain and a per-route chain, run in
//!   declaration order with the first middleware outermost
//! - **Controller dispatch** – controllers and middlewares come from a service
//!   container and arguments are bound from route arguments, the request and
//!   the container
//! - **Error rendering** – every failure becomes a JSON error response, with
//!   developer details only in debug mode
//!
//! ## Quick Start
//!
//! ```
//! use micro::prelude::*;
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut container = Container::new();
//! container.register_controller(
//!     "HelloController",
//!     ControllerMethods::new().method("greet", |arguments: Arguments| async move {
//!         let name = arguments.text("name").unwrap_or("world").to_string();
//!         Ok(http::Response::new(Full::new(Bytes::from(format!("Hello, {name}!")))))
//!     }),
//! );
//!
//! let routes = RouteTable::new().with(
//!     "hello",
//!     Route::to("HelloController", "greet").parameter(Parameter::scalar("name")),
//! );
//!
//! let kernel = Kernel::builder()
//!     .container(Arc::new(container))
//!     .resolver(Arc::new(routes))
//!     .build()
//!     .unwrap();
//!
//! let request = Request::new(http::Method::GET, "/hello/micro".parse().unwrap())
//!     .with_route_result(RouteResolution::matched(
//!         "hello",
//!         [("name", "micro")].into_iter().collect(),
//!     ));
//!
//! let response = kernel.handle(request).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # });
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | Request, errors, routes, container, controllers |
//! | [`middleware`] | Chain, stages, dispatch and argument binding |
//! | [`config`] | Layered configuration |
//! | [`telemetry`] | Log subscriber setup |

#![doc(html_root_url = "https://docs.rs/micro/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod kernel;

pub use kernel::{load_config, log_config, Kernel, KernelBuilder, KernelError, ENV_PREFIX};
pub use micro_config::MicroConfig;

// Re-export member crates
pub use micro_config as config;
pub use micro_core as core;
pub use micro_middleware as middleware;
pub use micro_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```
/// use micro::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Kernel, KernelBuilder, KernelError, MicroConfig};

    pub use micro_core::{
        Arguments, Container, Controller, ControllerMethods, FieldError, HandlerResult, HttpError,
        Parameter, Request, Response, Route, RouteResolution, RouteTable, ServiceContainer,
        ServiceContainerExt,
    };

    pub use micro_middleware::{
        BoxFuture, FnMiddleware, Handler, Middleware, MiddlewareRegistry, Next,
    };
}
