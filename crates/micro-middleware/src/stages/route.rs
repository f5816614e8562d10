//! Route stage.
//!
//! Interprets the route-resolution result attached to the request:
//!
//! | Result | Outcome |
//! |---|---|
//! | `NotFound` | 404 failure |
//! | `MethodNotAllowed` | 405 failure listing the allowed methods |
//! | `Matched` | resolves the [`Route`](micro_core::Route), attaches it and continues |

use crate::middleware::{Middleware, Next};
use micro_core::{BoxFuture, HandlerResult, HttpError, Request, RouteResolution, RouteResolver};
use std::fmt;
use std::sync::Arc;

/// Turns a route-resolution result into a resolved route or a routing failure.
#[derive(Clone)]
pub struct RouteStage {
    resolver: Arc<dyn RouteResolver>,
}

impl RouteStage {
    /// Creates a route stage backed by `resolver`.
    pub fn new(resolver: Arc<dyn RouteResolver>) -> Self {
        Self { resolver }
    }

    async fn route(&self, request: Request, next: Next<'_>) -> HandlerResult {
        let resolution = request
            .route_result()
            .expect("route stage reached without a route resolution result");

        tracing::debug!(
            status = %resolution.status(),
            path = request.path(),
            "Route resolution"
        );

        let identifier = match resolution {
            RouteResolution::NotFound => return Err(HttpError::not_found().into()),
            RouteResolution::MethodNotAllowed {
                identifier,
                allowed_methods,
            } => {
                return Err(HttpError::method_not_allowed(allowed_methods.iter().cloned())
                    .with_message(format!(
                        "Allowed methods {}: {}",
                        identifier.as_deref().unwrap_or("-"),
                        allowed_methods.join(", ")
                    ))
                    .into());
            }
            RouteResolution::Matched { identifier, .. } => identifier.clone(),
        };

        let route = self
            .resolver
            .resolve(&identifier)
            .map_err(|err| HttpError::internal().with_source(err))?;

        next.run(request.with_route(route)).await
    }
}

impl Middleware for RouteStage {
    fn name(&self) -> &'static str {
        "route"
    }

    /// # Panics
    ///
    /// Panics if the request carries no route-resolution result; attaching
    /// one is the job of an earlier stage.
    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.route(request, next))
    }
}

impl fmt::Debug for RouteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteStage").finish_non_exhaustive()
    }
}
