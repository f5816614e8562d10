//! Pipeline stages.
//!
//! The kernel composes these around the application's global middlewares:
//!
//! 1. [`error`] - error boundary, renders failures as JSON responses
//! 2. global middlewares, in registration order
//! 3. [`matching`] - attaches a route matcher's result (optional)
//! 4. [`route`] - interprets the route-resolution result
//! 5. [`ControllerDispatchStage`](crate::ControllerDispatchStage) - per-route chain and controller

pub mod error;
pub mod matching;
pub mod route;

pub use error::ErrorStage;
pub use matching::{MatchStage, RouteMatcher};
pub use route::RouteStage;
