//! Request and response types.
//!
//! The [`Request`] carries the HTTP request head and body together with a
//! strongly typed [`RequestContext`]. Stages never mutate a request in place
//! to add context: [`Request::with_route_result`] and [`Request::with_route`]
//! consume the request and return a new one carrying the old context plus the
//! new field.

use crate::route::{Route, RouteResolution};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// The HTTP response type produced by the pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request context passed between stages.
///
/// Holds explicit optional fields instead of an untyped attribute map:
/// the route-resolution result attached before routing, and the resolved
/// [`Route`] attached by the route stage.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: RequestId,
    route_result: Option<RouteResolution>,
    route: Option<Arc<Route>>,
}

impl RequestContext {
    /// Creates an empty context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the route-resolution result, if attached.
    #[must_use]
    pub fn route_result(&self) -> Option<&RouteResolution> {
        self.route_result.as_ref()
    }

    /// Returns the resolved route, if attached.
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }
}

/// An inbound HTTP request flowing through the pipeline.
///
/// Cloning is cheap: the body is reference counted.
///
/// # Example
///
/// ```
/// use micro_core::{Request, RouteResolution};
/// use http::Method;
///
/// let request = Request::new(Method::GET, "/users/42".parse().unwrap());
/// assert!(request.route_result().is_none());
///
/// let request = request.with_route_result(RouteResolution::not_found());
/// assert!(request.route_result().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: RequestContext,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: RequestContext::new(),
        }
    }

    /// Creates a request from an `http::Request` with a collected body.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            context: RequestContext::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a request carrying the given route-resolution result.
    #[must_use]
    pub fn with_route_result(mut self, result: RouteResolution) -> Self {
        self.context.route_result = Some(result);
        self
    }

    /// Returns a request carrying the given resolved route.
    #[must_use]
    pub fn with_route(mut self, route: Arc<Route>) -> Self {
        self.context.route = Some(route);
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the request context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.context.request_id
    }

    /// Returns the route-resolution result, if attached.
    #[must_use]
    pub fn route_result(&self) -> Option<&RouteResolution> {
        self.context.route_result()
    }

    /// Returns the resolved route, if attached.
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.context.route()
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        Self::from_http(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Route, RouteArguments};

    fn make_request() -> Request {
        Request::from_http(
            http::Request::builder()
                .method(Method::POST)
                .uri("/users?page=2")
                .header("content-type", "application/json")
                .body(Bytes::from_static(b"{}"))
                .unwrap(),
        )
    }

    #[test]
    fn test_from_http() {
        let request = make_request();
        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.path(), "/users");
        assert_eq!(request.uri().query(), Some("page=2"));
        assert_eq!(request.headers()["content-type"], "application/json");
        assert_eq!(request.body().as_ref(), b"{}");
    }

    #[test]
    fn test_new_request_has_empty_context() {
        let request = make_request();
        assert!(request.route_result().is_none());
        assert!(request.route().is_none());
    }

    #[test]
    fn test_with_route_result_keeps_other_fields() {
        let route = Arc::new(Route::to("users", "index"));
        let request = make_request().with_route(route.clone());
        let id = request.request_id();

        let mut arguments = RouteArguments::new();
        arguments.push("id", "42");
        let request = request.with_route_result(RouteResolution::matched("users.show", arguments));

        assert_eq!(request.request_id(), id);
        assert!(Arc::ptr_eq(request.route().unwrap(), &route));
        assert_eq!(
            request.route_result().unwrap().identifier(),
            Some("users.show")
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let original = make_request();
        let copy = original.clone().with_route_result(RouteResolution::not_found());
        assert!(original.route_result().is_none());
        assert!(copy.route_result().is_some());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(!a.to_string().is_empty());
    }
}
