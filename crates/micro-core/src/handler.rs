//! Controller abstraction.
//!
//! A [`Controller`] is the unit the dispatcher invokes at the end of a route's
//! chain. It receives the method name from the route's handler reference and
//! the bound [`Arguments`], in the order the route declared its parameters.

use crate::di::Service;
use crate::request::{Request, Response};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// A boxed future used throughout the pipeline.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of every pipeline stage.
///
/// Failures are carried as [`anyhow::Error`]; the error stage downcasts to
/// [`HttpError`](crate::HttpError) and treats anything else as untyped.
pub type HandlerResult = Result<Response, anyhow::Error>;

/// Errors raised while invoking a controller method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The controller has no method with this name.
    #[error("controller has no method \"{method}\"")]
    UnknownMethod {
        /// The requested method name.
        method: String,
    },
}

/// A bound argument value.
#[derive(Debug, Clone)]
pub enum Argument {
    /// A route argument.
    Text(String),
    /// The current request.
    Request(Request),
    /// A service from the container.
    Service(Service),
    /// No binder produced a value.
    Null,
}

impl Argument {
    /// Returns the text value, if this is a route argument.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the request, if this argument holds one.
    #[must_use]
    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Request(request) => Some(request),
            _ => None,
        }
    }

    /// Returns the service as `Arc<T>`, if this argument holds a `T`.
    #[must_use]
    pub fn as_service<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self {
            Self::Service(service) => service.downcast::<T>(),
            _ => None,
        }
    }

    /// Returns true if no value was bound.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Arguments bound for a controller call, in declaration order.
///
/// Values can be read by parameter name or by position.
///
/// # Example
///
/// ```rust
/// use micro_core::{Argument, Arguments};
///
/// let mut arguments = Arguments::new();
/// arguments.push("id", Argument::Text("42".into()));
/// arguments.push("filter", Argument::Null);
///
/// assert_eq!(arguments.text("id"), Some("42"));
/// assert_eq!(arguments.parse::<u64>("id"), Some(42));
/// assert!(arguments.is_null("filter"));
/// assert_eq!(arguments.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    inner: Vec<(String, Argument)>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.inner.push((name.into(), argument));
    }

    /// Returns an argument by parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, argument)| argument)
    }

    /// Returns an argument by position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Argument> {
        self.inner.get(index).map(|(_, argument)| argument)
    }

    /// Returns a text argument by name.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Argument::as_text)
    }

    /// Parses a text argument by name.
    ///
    /// Returns `None` when the argument is missing, not text, or does not parse.
    #[must_use]
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.text(name).and_then(|text| text.parse().ok())
    }

    /// Returns a request argument by name.
    #[must_use]
    pub fn request(&self, name: &str) -> Option<&Request> {
        self.get(name).and_then(Argument::as_request)
    }

    /// Returns a service argument by name.
    #[must_use]
    pub fn service<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get(name).and_then(Argument::as_service::<T>)
    }

    /// Returns true if the argument is missing or bound to null.
    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).map_or(true, Argument::is_null)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over `(name, argument)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.inner.iter().map(|(n, a)| (n.as_str(), a))
    }
}

/// A controller invoked by method name.
///
/// Implementations typically `match` on the method name:
///
/// ```rust
/// use micro_core::{Arguments, BoxFuture, Controller, HandlerResult, HttpError, InvocationError};
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// struct UserController;
///
/// impl Controller for UserController {
///     fn call<'a>(&'a self, method: &'a str, arguments: Arguments) -> BoxFuture<'a, HandlerResult> {
///         Box::pin(async move {
///             let result: HandlerResult = match method {
///                 "show" => {
///                     let id: u64 = arguments.parse("id").ok_or_else(HttpError::bad_request)?;
///                     Ok(http::Response::new(Full::new(Bytes::from(format!("user {id}")))))
///                 }
///                 _ => Err(InvocationError::UnknownMethod { method: method.to_string() }.into()),
///             };
///             result
///         })
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Invokes `method` with the bound arguments.
    fn call<'a>(&'a self, method: &'a str, arguments: Arguments) -> BoxFuture<'a, HandlerResult>;
}

type MethodFn = Arc<dyn Fn(Arguments) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A [`Controller`] built from closures, one per method.
///
/// # Example
///
/// ```rust
/// use micro_core::ControllerMethods;
/// use bytes::Bytes;
/// use http_body_util::Full;
///
/// let controller = ControllerMethods::new()
///     .method("index", |_arguments| async {
///         Ok(http::Response::new(Full::new(Bytes::from("[]"))))
///     });
///
/// assert!(controller.contains("index"));
/// ```
#[derive(Clone, Default)]
pub struct ControllerMethods {
    methods: HashMap<String, MethodFn>,
}

impl ControllerMethods {
    /// Creates a controller with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method.
    #[must_use]
    pub fn method<F, Fut>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let method: MethodFn = Arc::new(move |arguments| Box::pin(method(arguments)));
        self.methods.insert(name.into(), method);
        self
    }

    /// Returns true if a method with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl Controller for ControllerMethods {
    fn call<'a>(&'a self, method: &'a str, arguments: Arguments) -> BoxFuture<'a, HandlerResult> {
        match self.methods.get(method) {
            Some(f) => f(arguments),
            None => Box::pin(async move {
                HandlerResult::Err(
                    InvocationError::UnknownMethod {
                        method: method.to_string(),
                    }
                    .into(),
                )
            }),
        }
    }
}

impl fmt::Debug for ControllerMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("ControllerMethods")
            .field("methods", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpError;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn ok(body: &'static str) -> Response {
        http::Response::new(Full::new(Bytes::from_static(body.as_bytes())))
    }

    #[test]
    fn test_arguments_by_name_and_position() {
        let mut arguments = Arguments::new();
        arguments.push("id", Argument::Text("7".to_string()));
        arguments.push("missing", Argument::Null);

        assert_eq!(arguments.text("id"), Some("7"));
        assert_eq!(arguments.parse::<i32>("id"), Some(7));
        assert_eq!(arguments.at(0).and_then(Argument::as_text), Some("7"));
        assert!(arguments.at(1).unwrap().is_null());
        assert!(arguments.at(2).is_none());
        assert!(arguments.is_null("missing"));
        assert!(arguments.is_null("absent"));
        assert!(!arguments.is_null("id"));
    }

    #[test]
    fn test_parse_failure_is_none() {
        let mut arguments = Arguments::new();
        arguments.push("id", Argument::Text("abc".to_string()));
        assert_eq!(arguments.parse::<u32>("id"), None);
    }

    #[test]
    fn test_service_argument() {
        let mut arguments = Arguments::new();
        arguments.push("name", Argument::Service(Service::new(Arc::new("svc".to_string()))));

        assert_eq!(
            arguments.service::<String>("name").as_deref().map(String::as_str),
            Some("svc")
        );
        assert!(arguments.service::<u32>("name").is_none());
        assert!(arguments.text("name").is_none());
    }

    #[test]
    fn test_iter_keeps_order() {
        let mut arguments = Arguments::new();
        arguments.push("b", Argument::Null);
        arguments.push("a", Argument::Text("x".to_string()));
        let names: Vec<_> = arguments.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_controller_methods_dispatch() {
        let controller = ControllerMethods::new()
            .method("index", |_| async { Ok(ok("index")) })
            .method("fail", |_| async {
                Err(anyhow::Error::new(HttpError::conflict("taken")))
            });

        let response = controller.call("index", Arguments::new()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let err = controller.call("fail", Arguments::new()).await.unwrap_err();
        let err = err.downcast::<HttpError>().unwrap();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let controller = ControllerMethods::new();
        let err = controller.call("missing", Arguments::new()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<InvocationError>(),
            Some(&InvocationError::UnknownMethod {
                method: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_debug_lists_methods() {
        let controller = ControllerMethods::new()
            .method("b", |_| async { Ok(ok("")) })
            .method("a", |_| async { Ok(ok("")) });
        assert_eq!(
            format!("{controller:?}"),
            "ControllerMethods { methods: [\"a\", \"b\"] }"
        );
    }
}
