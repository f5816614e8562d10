//! Controller invocation.
//!
//! The [`ControllerInvoker`] is the innermost handler of a route's chain. It
//! looks up the controller named by the route, binds one argument per
//! declared parameter and calls the controller method. Whatever the
//! controller returns, response or failure, is passed through untouched.

use crate::binding::{bind_parameter, default_binders, BindingScope, ParameterBinder};
use crate::middleware::Handler;
use micro_core::{
    Arguments, BoxFuture, HandlerResult, HttpError, Request, ServiceContainer, ServiceContainerExt,
};
use std::fmt;
use std::sync::Arc;

/// Calls the controller method of the request's resolved route.
#[derive(Clone)]
pub struct ControllerInvoker {
    container: Arc<dyn ServiceContainer>,
    binders: Arc<[Arc<dyn ParameterBinder>]>,
}

impl ControllerInvoker {
    /// Creates an invoker using the default binder rules.
    pub fn new(container: Arc<dyn ServiceContainer>) -> Self {
        Self::with_binders(container, default_binders())
    }

    /// Creates an invoker with a custom binder sequence.
    pub fn with_binders<I>(container: Arc<dyn ServiceContainer>, binders: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ParameterBinder>>,
    {
        Self {
            container,
            binders: binders.into_iter().collect(),
        }
    }

    /// Binds the arguments for `request`'s route, in declaration order.
    ///
    /// # Panics
    ///
    /// Panics if the request carries no resolved route.
    pub fn bind_arguments(&self, request: &Request) -> anyhow::Result<Arguments> {
        let route = request
            .route()
            .expect("controller invoked without a resolved route");
        let scope = BindingScope::new(request, self.container.as_ref());

        let mut arguments = Arguments::new();
        for parameter in route.parameters() {
            let argument = bind_parameter(&self.binders, parameter, &scope)?;
            arguments.push(parameter.name(), argument);
        }
        Ok(arguments)
    }

    async fn invoke(&self, request: Request) -> HandlerResult {
        let route = request
            .route()
            .cloned()
            .expect("controller invoked without a resolved route");
        let handler = route.handler();

        // An unregistered controller is reported as a missing resource.
        if !self.container.has(handler.service()) {
            return Err(HttpError::not_found()
                .with_message(format!("Controller \"{}\" is not registered", handler.service()))
                .into());
        }

        let arguments = self.bind_arguments(&request)?;
        let controller = self.container.controller(handler.service())?;

        tracing::debug!(
            controller = %handler,
            arguments = arguments.len(),
            "Invoking controller"
        );

        controller.call(handler.method(), arguments).await
    }
}

impl Handler for ControllerInvoker {
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        Box::pin(self.invoke(request))
    }
}

impl fmt::Debug for ControllerInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInvoker")
            .field("binders", &self.binders.len())
            .finish_non_exhaustive()
    }
}
