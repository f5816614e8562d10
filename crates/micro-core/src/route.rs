//! Route model.
//!
//! Route matching itself happens outside this crate. What arrives here is a
//! [`RouteResolution`], the outcome of matching a request against the route
//! table, and a [`RouteResolver`] that turns a matched identifier into a
//! [`Route`]: the controller reference, the per-route middleware list and the
//! declared parameters of the controller method.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of arguments stored inline (stack allocated).
const INLINE_ARGUMENTS: usize = 4;

/// Errors raised while building or resolving routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No route is registered under the identifier.
    #[error("route \"{identifier}\" does not exist")]
    UnknownRoute {
        /// The identifier that was looked up.
        identifier: String,
    },

    /// A handler string is not of the form `service::method`.
    #[error("invalid handler \"{handler}\", expected \"service::method\"")]
    InvalidHandler {
        /// The rejected handler string.
        handler: String,
    },
}

/// Route arguments extracted by the matcher.
///
/// Uses small-vector optimization to avoid heap allocation for common
/// cases with few arguments. Arguments are stored as (name, value) pairs
/// in extraction order.
///
/// # Example
///
/// ```rust
/// use micro_core::RouteArguments;
///
/// let mut arguments = RouteArguments::new();
/// arguments.push("userId", "123");
///
/// assert_eq!(arguments.get("userId"), Some("123"));
/// assert_eq!(arguments.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteArguments {
    inner: SmallVec<[(String, String); INLINE_ARGUMENTS]>,
}

impl RouteArguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value of an argument by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if an argument with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteArguments
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Status of a [`RouteResolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStatus {
    /// A route matched.
    Matched,
    /// No route matched the path.
    NotFound,
    /// The path matched but not the method.
    MethodNotAllowed,
}

impl ResolutionStatus {
    /// Returns the status name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of matching a request against the route table.
///
/// Exactly one of the three shapes is valid at a time; the variant fully
/// determines which data is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResolution {
    /// A route matched.
    Matched {
        /// Identifier of the matched route.
        identifier: String,
        /// Arguments extracted from the path.
        arguments: RouteArguments,
    },
    /// No route matched.
    NotFound,
    /// A route matched the path but not the request method.
    MethodNotAllowed {
        /// Identifier of the attempted route, when known.
        identifier: Option<String>,
        /// Methods the route accepts, in the matcher's order.
        allowed_methods: Vec<String>,
    },
}

impl RouteResolution {
    /// Creates a matched result.
    pub fn matched(identifier: impl Into<String>, arguments: RouteArguments) -> Self {
        Self::Matched {
            identifier: identifier.into(),
            arguments,
        }
    }

    /// Creates a not-found result.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::NotFound
    }

    /// Creates a method-not-allowed result.
    pub fn method_not_allowed<I, S>(identifier: Option<String>, allowed_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MethodNotAllowed {
            identifier,
            allowed_methods: allowed_methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the status of this result.
    #[must_use]
    pub const fn status(&self) -> ResolutionStatus {
        match self {
            Self::Matched { .. } => ResolutionStatus::Matched,
            Self::NotFound => ResolutionStatus::NotFound,
            Self::MethodNotAllowed { .. } => ResolutionStatus::MethodNotAllowed,
        }
    }

    /// Returns the route identifier, if the result carries one.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Matched { identifier, .. } => Some(identifier),
            Self::MethodNotAllowed { identifier, .. } => identifier.as_deref(),
            Self::NotFound => None,
        }
    }

    /// Returns the extracted arguments of a matched result.
    #[must_use]
    pub fn arguments(&self) -> Option<&RouteArguments> {
        match self {
            Self::Matched { arguments, .. } => Some(arguments),
            _ => None,
        }
    }
}

/// Reference to a controller method: `(service identifier, method name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    service: String,
    method: String,
}

impl HandlerRef {
    /// Creates a handler reference.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Parses a `service::method` string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use micro_core::HandlerRef;
    ///
    /// let handler = HandlerRef::parse("app.controller.users::show").unwrap();
    /// assert_eq!(handler.service(), "app.controller.users");
    /// assert_eq!(handler.method(), "show");
    /// ```
    pub fn parse(handler: &str) -> Result<Self, RouteError> {
        match handler.split_once("::") {
            Some((service, method))
                if !service.is_empty() && !method.is_empty() && !method.contains("::") =>
            {
                Ok(Self::new(service, method))
            }
            _ => Err(RouteError::InvalidHandler {
                handler: handler.to_string(),
            }),
        }
    }

    /// Returns the service identifier.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.service, self.method)
    }
}

/// Declared type of a controller method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// No declared type.
    Untyped,
    /// A scalar value (string, number, boolean).
    Scalar,
    /// The current request.
    Request,
    /// A service resolvable from the container under this identifier.
    Service(String),
}

/// Declared parameter of a controller method.
///
/// Built once at route registration; the invoker binds arguments from these
/// descriptors in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    name: String,
    kind: ParameterType,
}

impl Parameter {
    /// Creates a parameter with an explicit type.
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates an untyped parameter.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Untyped)
    }

    /// Creates a scalar parameter.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Scalar)
    }

    /// Creates a parameter receiving the current request.
    pub fn request(name: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Request)
    }

    /// Creates a parameter receiving the service registered under `id`.
    pub fn service(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, ParameterType::Service(id.into()))
    }

    /// Creates a parameter receiving the service registered for type `T`.
    ///
    /// Pairs with [`Container::register_type`](crate::Container::register_type).
    pub fn of_type<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::service(name, std::any::type_name::<T>())
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub fn kind(&self) -> &ParameterType {
        &self.kind
    }
}

/// A resolved route.
///
/// Immutable once built. Middleware identifiers are listed in execution
/// order, outermost first.
///
/// # Example
///
/// ```rust
/// use micro_core::{Parameter, Route};
///
/// let route = Route::to("app.controller.users", "show")
///     .middleware("app.middleware.auth")
///     .parameter(Parameter::scalar("id"))
///     .parameter(Parameter::request("request"));
///
/// assert_eq!(route.handler().to_string(), "app.controller.users::show");
/// assert_eq!(route.middleware_ids(), ["app.middleware.auth"]);
/// assert_eq!(route.parameters().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    handler: HandlerRef,
    middlewares: Vec<String>,
    parameters: Vec<Parameter>,
}

impl Route {
    /// Creates a route for the given handler.
    #[must_use]
    pub fn new(handler: HandlerRef) -> Self {
        Self {
            handler,
            middlewares: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Creates a route for `service::method`.
    pub fn to(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(HandlerRef::new(service, method))
    }

    /// Creates a route from a `service::method` handler string.
    pub fn parse(handler: &str) -> Result<Self, RouteError> {
        HandlerRef::parse(handler).map(Self::new)
    }

    /// Appends a middleware identifier (runs inside the ones added before).
    #[must_use]
    pub fn middleware(mut self, id: impl Into<String>) -> Self {
        self.middlewares.push(id.into());
        self
    }

    /// Appends several middleware identifiers.
    #[must_use]
    pub fn middlewares<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middlewares.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Appends a declared handler parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Returns the handler reference.
    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Returns the middleware identifiers, outermost first.
    #[must_use]
    pub fn middleware_ids(&self) -> &[String] {
        &self.middlewares
    }

    /// Returns the declared handler parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// Resolves a matched route identifier to a [`Route`].
pub trait RouteResolver: Send + Sync + 'static {
    /// Returns the route registered under `identifier`.
    fn resolve(&self, identifier: &str) -> Result<Arc<Route>, RouteError>;
}

/// An in-memory [`RouteResolver`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Arc<Route>>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route under an identifier, replacing any previous one.
    pub fn insert(&mut self, identifier: impl Into<String>, route: Route) {
        self.routes.insert(identifier.into(), Arc::new(route));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, identifier: impl Into<String>, route: Route) -> Self {
        self.insert(identifier, route);
        self
    }

    /// Returns true if a route is registered under `identifier`.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.routes.contains_key(identifier)
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteResolver for RouteTable {
    fn resolve(&self, identifier: &str) -> Result<Arc<Route>, RouteError> {
        self.routes
            .get(identifier)
            .cloned()
            .ok_or_else(|| RouteError::UnknownRoute {
                identifier: identifier.to_string(),
            })
    }
}
