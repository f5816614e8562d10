//! Controller argument binding.
//!
//! For every declared [`Parameter`] of a route, the invoker asks each
//! [`ParameterBinder`] in turn for a value. The first binder returning
//! `Some` wins; a parameter no binder claims is bound to
//! [`Argument::Null`]. The default rules, in order:
//!
//! 1. [`RouteArgumentBinder`] - a route argument with the parameter's name
//! 2. [`RequestBinder`] - the current request, for request-typed parameters
//! 3. [`ContainerBinder`] - a container service, for service-typed parameters
//!    whose identifier is registered

use micro_core::{Argument, Parameter, ParameterType, Request, RouteArguments, ServiceContainer};
use std::sync::Arc;

/// What a binder can see while binding one controller call.
#[derive(Clone, Copy)]
pub struct BindingScope<'a> {
    request: &'a Request,
    arguments: Option<&'a RouteArguments>,
    container: &'a dyn ServiceContainer,
}

impl<'a> BindingScope<'a> {
    /// Creates a scope over the current request and container.
    ///
    /// Route arguments are taken from the request's matched route result.
    pub fn new(request: &'a Request, container: &'a dyn ServiceContainer) -> Self {
        Self {
            request,
            arguments: request.route_result().and_then(|result| result.arguments()),
            container,
        }
    }

    /// Returns the current request.
    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    /// Returns a route argument by name.
    #[must_use]
    pub fn route_argument(&self, name: &str) -> Option<&'a str> {
        self.arguments.and_then(|arguments| arguments.get(name))
    }

    /// Returns the service container.
    #[must_use]
    pub fn container(&self) -> &'a dyn ServiceContainer {
        self.container
    }
}

/// A rule producing an argument for a declared parameter.
///
/// Returning `Ok(None)` passes the parameter on to the next binder. An error
/// aborts the controller call.
pub trait ParameterBinder: Send + Sync + 'static {
    /// Tries to bind `parameter`.
    fn bind(&self, parameter: &Parameter, scope: &BindingScope<'_>)
        -> anyhow::Result<Option<Argument>>;
}

/// Binds parameters named like a route argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteArgumentBinder;

impl ParameterBinder for RouteArgumentBinder {
    fn bind(
        &self,
        parameter: &Parameter,
        scope: &BindingScope<'_>,
    ) -> anyhow::Result<Option<Argument>> {
        Ok(scope
            .route_argument(parameter.name())
            .map(|value| Argument::Text(value.to_string())))
    }
}

/// Binds request-typed parameters to the current request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBinder;

impl ParameterBinder for RequestBinder {
    fn bind(
        &self,
        parameter: &Parameter,
        scope: &BindingScope<'_>,
    ) -> anyhow::Result<Option<Argument>> {
        Ok(match parameter.kind() {
            ParameterType::Request => Some(Argument::Request(scope.request().clone())),
            _ => None,
        })
    }
}

/// Binds service-typed parameters to registered container services.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerBinder;

impl ParameterBinder for ContainerBinder {
    fn bind(
        &self,
        parameter: &Parameter,
        scope: &BindingScope<'_>,
    ) -> anyhow::Result<Option<Argument>> {
        match parameter.kind() {
            ParameterType::Service(id) if scope.container().has(id) => {
                Ok(Some(Argument::Service(scope.container().get(id)?)))
            }
            _ => Ok(None),
        }
    }
}

/// Returns the default binder rules in evaluation order.
#[must_use]
pub fn default_binders() -> Vec<Arc<dyn ParameterBinder>> {
    vec![
        Arc::new(RouteArgumentBinder),
        Arc::new(RequestBinder),
        Arc::new(ContainerBinder),
    ]
}

/// Binds `parameter` with the first binder that claims it.
pub fn bind_parameter(
    binders: &[Arc<dyn ParameterBinder>],
    parameter: &Parameter,
    scope: &BindingScope<'_>,
) -> anyhow::Result<Argument> {
    for binder in binders {
        if let Some(argument) = binder.bind(parameter, scope)? {
            return Ok(argument);
        }
    }
    Ok(Argument::Null)
}
