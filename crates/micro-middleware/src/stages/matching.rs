//! Route matching stage.
//!
//! Route matching is an external concern. When the host does not attach a
//! [`RouteResolution`] to requests itself, this stage asks a [`RouteMatcher`]
//! for one before the [`RouteStage`](super::RouteStage) runs.

use crate::middleware::{Middleware, Next};
use micro_core::{BoxFuture, HandlerResult, Request, RouteResolution};
use std::fmt;
use std::sync::Arc;

/// Matches a request against a route table.
pub trait RouteMatcher: Send + Sync + 'static {
    /// Returns the resolution result for `request`.
    fn match_request(&self, request: &Request) -> RouteResolution;
}

impl<F> RouteMatcher for F
where
    F: Fn(&Request) -> RouteResolution + Send + Sync + 'static,
{
    fn match_request(&self, request: &Request) -> RouteResolution {
        self(request)
    }
}

/// Attaches the matcher's result to requests that do not carry one yet.
#[derive(Clone)]
pub struct MatchStage {
    matcher: Arc<dyn RouteMatcher>,
}

impl MatchStage {
    /// Creates a match stage backed by `matcher`.
    pub fn new(matcher: Arc<dyn RouteMatcher>) -> Self {
        Self { matcher }
    }
}

impl Middleware for MatchStage {
    fn name(&self) -> &'static str {
        "match"
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        let request = if request.route_result().is_some() {
            request
        } else {
            let resolution = self.matcher.match_request(&request);
            request.with_route_result(resolution)
        };
        next.run(request)
    }
}

impl fmt::Debug for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchStage").finish_non_exhaustive()
    }
}
