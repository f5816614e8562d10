//! # Micro Core
//!
//! Core types and traits for the Micro request-processing runtime.
//!
//! This crate provides the foundational types used throughout Micro:
//!
//! - [`Request`] / [`RequestContext`] - Inbound request with typed per-request context
//! - [`HttpError`] - HTTP-aware failures with status code and JSON payload
//! - [`RouteResolution`] / [`Route`] - Route-matching outcome and resolved route
//! - [`Container`] - Service container for controllers, middlewares and services
//! - [`Controller`] - Controller invoked by method name with bound [`Arguments`]

#![doc(html_root_url = "https://docs.rs/micro-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod di;
mod error;
mod handler;
mod request;
pub mod route;

pub use di::{Container, ContainerError, Service, ServiceContainer, ServiceContainerExt};
pub use error::{FieldError, HttpError, HttpErrorKind, DEFAULT_MESSAGE};
pub use handler::{
    Argument, Arguments, BoxFuture, Controller, ControllerMethods, HandlerResult, InvocationError,
};
pub use request::{Request, RequestContext, RequestId, Response};
pub use route::{
    HandlerRef, Parameter, ParameterType, ResolutionStatus, Route, RouteArguments, RouteError,
    RouteResolution, RouteResolver, RouteTable,
};
