//! Service container.
//!
//! Controllers, middlewares and the services they depend on are looked up by
//! string identifier at dispatch time. A registration is either a shared
//! instance (the same `Arc` for every lookup) or a factory producing a fresh
//! instance per lookup, which is how per-request state is expressed.
//!
//! # Example
//!
//! ```rust
//! use micro_core::{Container, ServiceContainer, ServiceContainerExt};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut container = Container::new();
//! container.register("app.database", Arc::new(Database { url: "postgres://localhost".into() }));
//!
//! assert!(container.has("app.database"));
//! let db: Arc<Database> = container.resolve("app.database").unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```

use crate::handler::Controller;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error when a service cannot be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Nothing is registered under the identifier.
    #[error("service \"{id}\" is not registered")]
    NotRegistered {
        /// The requested identifier.
        id: String,
    },

    /// The registered service is not of the requested type.
    #[error("service \"{id}\" is a {found}, not a {expected}")]
    TypeMismatch {
        /// The requested identifier.
        id: String,
        /// The requested type.
        expected: &'static str,
        /// The registered type.
        found: &'static str,
    },
}

/// A type-erased service instance.
///
/// Holds an `Arc<T>` where `T` may be unsized (`dyn Controller`, a middleware
/// trait object, ...). Cloning is cheap.
#[derive(Clone)]
pub struct Service {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Service {
    /// Wraps a shared instance.
    pub fn new<T>(instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(instance),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the instance as `Arc<T>` if it was registered as `T`.
    #[must_use]
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns true if the instance was registered as `T`.
    #[must_use]
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner.is::<Arc<T>>()
    }

    /// Returns the registered type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Lookup capability of a service container.
pub trait ServiceContainer: Send + Sync + 'static {
    /// Returns true if something is registered under `id`.
    fn has(&self, id: &str) -> bool;

    /// Returns the instance registered under `id`.
    fn get(&self, id: &str) -> Result<Service, ContainerError>;
}

/// Typed lookups on top of [`ServiceContainer`].
pub trait ServiceContainerExt: ServiceContainer {
    /// Returns the instance registered under `id` as `Arc<T>`.
    fn resolve<T>(&self, id: &str) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let service = self.get(id)?;
        service
            .downcast::<T>()
            .ok_or_else(|| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>(),
                found: service.type_name(),
            })
    }

    /// Returns the controller registered under `id`.
    fn controller(&self, id: &str) -> Result<Arc<dyn Controller>, ContainerError> {
        self.resolve::<dyn Controller>(id)
    }
}

impl<C: ServiceContainer + ?Sized> ServiceContainerExt for C {}

type Factory = Arc<dyn Fn() -> Service + Send + Sync>;

#[derive(Clone)]
enum Registration {
    Shared(Service),
    Factory(Factory),
}

/// The default [`ServiceContainer`].
///
/// Registrations happen at startup; the container is then shared read-only
/// (typically behind an `Arc`) and is `Send + Sync`.
#[derive(Clone, Default)]
pub struct Container {
    services: HashMap<String, Registration>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared instance under `id`, replacing any previous one.
    ///
    /// `T` may be a trait object:
    ///
    /// ```rust
    /// use micro_core::{Container, ServiceContainerExt};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 7 }
    /// }
    ///
    /// let mut container = Container::new();
    /// container.register::<dyn Clock>("clock", Arc::new(Fixed));
    /// assert_eq!(container.resolve::<dyn Clock>("clock").unwrap().now(), 7);
    /// ```
    pub fn register<T>(&mut self, id: impl Into<String>, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .insert(id.into(), Registration::Shared(Service::new(instance)));
        self
    }

    /// Registers a shared instance keyed by its type name.
    ///
    /// Pairs with [`Parameter::of_type`](crate::Parameter::of_type).
    pub fn register_type<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register(std::any::type_name::<T>(), instance)
    }

    /// Registers a factory invoked on every lookup of `id`.
    pub fn register_factory<T, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Service::new(factory()));
        self.services
            .insert(id.into(), Registration::Factory(factory));
        self
    }

    /// Registers a controller under `id`.
    pub fn register_controller<C>(&mut self, id: impl Into<String>, controller: C) -> &mut Self
    where
        C: Controller,
    {
        let controller: Arc<dyn Controller> = Arc::new(controller);
        self.register(id, controller)
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceContainer for Container {
    fn has(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<Service, ContainerError> {
        match self.services.get(id) {
            Some(Registration::Shared(service)) => Ok(service.clone()),
            Some(Registration::Factory(factory)) => Ok(factory()),
            None => Err(ContainerError::NotRegistered { id: id.to_string() }),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.services.keys().collect();
        ids.sort();
        f.debug_struct("Container").field("services", &ids).finish()
    }
}
