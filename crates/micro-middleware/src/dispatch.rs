//! Controller dispatch stage.
//!
//! Terminal handler of the global chain. It builds the route's own chain,
//! the route middlewares resolved from the container wrapped around the
//! [`ControllerInvoker`], and runs the request through it.

use crate::chain::MiddlewareChainHandler;
use crate::invoker::ControllerInvoker;
use crate::middleware::{Handler, Middleware};
use crate::registry::MiddlewareContainerExt;
use micro_core::{BoxFuture, HandlerResult, Request, ServiceContainer};
use std::fmt;
use std::sync::Arc;

/// Runs the per-route middleware chain and the controller.
#[derive(Clone)]
pub struct ControllerDispatchStage {
    container: Arc<dyn ServiceContainer>,
    invoker: Arc<ControllerInvoker>,
}

impl ControllerDispatchStage {
    /// Creates a dispatch stage using a default [`ControllerInvoker`].
    pub fn new(container: Arc<dyn ServiceContainer>) -> Self {
        let invoker = ControllerInvoker::new(container.clone());
        Self::with_invoker(container, invoker)
    }

    /// Creates a dispatch stage with a custom invoker.
    pub fn with_invoker(container: Arc<dyn ServiceContainer>, invoker: ControllerInvoker) -> Self {
        Self {
            container,
            invoker: Arc::new(invoker),
        }
    }

    async fn dispatch(&self, request: Request) -> HandlerResult {
        let route = request
            .route()
            .cloned()
            .expect("dispatch stage reached without a resolved route");

        let middlewares = route
            .middleware_ids()
            .iter()
            .map(|id| self.container.middleware(id))
            .collect::<Result<Vec<Arc<dyn Middleware>>, _>>()?;

        tracing::debug!(
            controller = %route.handler(),
            middlewares = middlewares.len(),
            "Dispatching to controller"
        );

        let chain = MiddlewareChainHandler::new(self.invoker.clone(), middlewares);
        chain.handle(request).await
    }
}

impl Handler for ControllerDispatchStage {
    /// # Panics
    ///
    /// Panics if the request carries no resolved route.
    fn handle(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        Box::pin(self.dispatch(request))
    }
}

impl fmt::Debug for ControllerDispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDispatchStage")
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}
