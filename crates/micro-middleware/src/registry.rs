//! Middleware lookups in the service container.
//!
//! Route middlewares are referenced by identifier and resolved from the
//! container on each dispatch. They are stored as `Arc<dyn Middleware>`.

use crate::middleware::Middleware;
use micro_core::{Container, ContainerError, ServiceContainer, ServiceContainerExt};
use std::sync::Arc;

/// Middleware registration on [`Container`].
pub trait MiddlewareRegistry {
    /// Registers a shared middleware under `id`.
    fn register_middleware<M: Middleware>(&mut self, id: impl Into<String>, middleware: M)
        -> &mut Self;

    /// Registers a middleware factory invoked on every lookup of `id`.
    fn register_middleware_factory<M, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        M: Middleware,
        F: Fn() -> M + Send + Sync + 'static;
}

impl MiddlewareRegistry for Container {
    fn register_middleware<M: Middleware>(
        &mut self,
        id: impl Into<String>,
        middleware: M,
    ) -> &mut Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.register(id, middleware)
    }

    fn register_middleware_factory<M, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        M: Middleware,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register_factory(id, move || -> Arc<dyn Middleware> { Arc::new(factory()) })
    }
}

/// Typed middleware lookup on any [`ServiceContainer`].
pub trait MiddlewareContainerExt: ServiceContainer {
    /// Returns the middleware registered under `id`.
    fn middleware(&self, id: &str) -> Result<Arc<dyn Middleware>, ContainerError> {
        self.resolve::<dyn Middleware>(id)
    }
}

impl<C: ServiceContainer + ?Sized> MiddlewareContainerExt for C {}
