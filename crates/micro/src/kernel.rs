//! The application kernel.
//!
//! [`Kernel`] owns the configuration and the composed pipeline:
//!
//! ```text
//! ErrorStage → global middlewares → (MatchStage) → RouteStage → ControllerDispatchStage
//! ```
//!
//! It is built once with [`KernelBuilder`] and then shared between requests.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use micro_config::{ConfigError, ConfigLoader, LogFormat, MicroConfig};
use micro_core::{ContainerError, Request, Response, RouteResolver, ServiceContainer};
use micro_middleware::{
    ControllerDispatchStage, ControllerInvoker, ErrorDispatcher, ErrorListener, ErrorStage,
    MatchStage, Middleware, MiddlewareChainHandler, MiddlewareContainerExt, ParameterBinder,
    RouteMatcher, RouteStage,
};
use micro_telemetry::{LogConfig, TelemetryError};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Environment prefix used by [`load_config`].
pub const ENV_PREFIX: &str = "MICRO";

/// Errors raised while building a [`Kernel`].
#[derive(Debug, Error)]
pub enum KernelError {
    /// No service container was supplied.
    #[error("kernel requires a service container")]
    MissingContainer,

    /// No route resolver was supplied.
    #[error("kernel requires a route resolver")]
    MissingResolver,

    /// A global middleware named by id could not be resolved.
    #[error("failed to resolve global middleware: {0}")]
    Middleware(#[from] ContainerError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loads configuration the standard way.
///
/// Reads `.env` if present, then applies `MICRO__SECTION__KEY` variables and
/// finally `APP_NAME`, `APP_VERSION`, `APP_ENV` and `APP_DEBUG`.
///
/// # Errors
///
/// Returns `ConfigError` if `.env` or an environment value is malformed.
pub fn load_config() -> Result<MicroConfig, ConfigError> {
    ConfigLoader::new()
        .with_dotenv()?
        .with_env_prefix(ENV_PREFIX)
        .with_kernel_env()
        .load()
}

/// Derives the logging setup from the application configuration.
pub fn log_config(config: &MicroConfig) -> LogConfig {
    LogConfig {
        enabled: config.logging.enabled,
        level: config.logging.level.clone(),
        json_format: config.logging.format == LogFormat::Json,
        file_line_info: config.logging.include_location,
        span_events: config.app.debug,
        ..LogConfig::default()
    }
    .with_service_name(config.app.name.clone())
}

enum GlobalMiddleware {
    Instance(Arc<dyn Middleware>),
    Service(String),
}

/// Builder for [`Kernel`].
///
/// # Example
///
/// ```
/// use micro::{Kernel, MicroConfig};
/// use micro_core::{Container, RouteTable};
/// use std::sync::Arc;
///
/// let kernel = Kernel::builder()
///     .config(MicroConfig::development())
///     .container(Arc::new(Container::new()))
///     .resolver(Arc::new(RouteTable::new()))
///     .build()
///     .unwrap();
///
/// assert!(kernel.is_debug());
/// ```
#[must_use]
pub struct KernelBuilder {
    config: MicroConfig,
    container: Option<Arc<dyn ServiceContainer>>,
    resolver: Option<Arc<dyn RouteResolver>>,
    matcher: Option<Arc<dyn RouteMatcher>>,
    middlewares: Vec<GlobalMiddleware>,
    dispatcher: ErrorDispatcher,
    binders: Option<Vec<Arc<dyn ParameterBinder>>>,
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: MicroConfig::default(),
            container: None,
            resolver: None,
            matcher: None,
            middlewares: Vec::new(),
            dispatcher: ErrorDispatcher::new(),
            binders: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: MicroConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the service container holding controllers and middlewares.
    pub fn container(mut self, container: Arc<dyn ServiceContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Sets the route resolver.
    pub fn resolver(mut self, resolver: Arc<dyn RouteResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the matcher used for requests that arrive without a
    /// route-resolution result.
    pub fn matcher(mut self, matcher: impl RouteMatcher) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Appends a global middleware.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares
            .push(GlobalMiddleware::Instance(Arc::new(middleware)));
        self
    }

    /// Appends a global middleware registered in the container under `id`.
    /// It is resolved once, when the kernel is built.
    pub fn middleware_service(mut self, id: impl Into<String>) -> Self {
        self.middlewares.push(GlobalMiddleware::Service(id.into()));
        self
    }

    /// Appends an error listener.
    pub fn error_listener(mut self, listener: impl ErrorListener) -> Self {
        self.dispatcher.listen(listener);
        self
    }

    /// Replaces the default parameter binder rules.
    pub fn binders<I>(mut self, binders: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ParameterBinder>>,
    {
        self.binders = Some(binders.into_iter().collect());
        self
    }

    /// Validates the configuration and composes the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `KernelError` if the container or resolver is missing, the
    /// configuration is invalid or a global middleware id is not registered.
    pub fn build(self) -> Result<Kernel, KernelError> {
        self.config.validate()?;

        let container = self.container.ok_or(KernelError::MissingContainer)?;
        let resolver = self.resolver.ok_or(KernelError::MissingResolver)?;

        let error_stage = ErrorStage::new(self.dispatcher)
            .debug(self.config.app.debug)
            .log_errors(self.config.errors.log_errors);

        let mut stages: Vec<Arc<dyn Middleware>> = Vec::new();
        for middleware in self.middlewares {
            stages.push(match middleware {
                GlobalMiddleware::Instance(middleware) => middleware,
                GlobalMiddleware::Service(id) => container.middleware(&id)?,
            });
        }
        if let Some(matcher) = self.matcher {
            stages.push(Arc::new(MatchStage::new(matcher)));
        }
        stages.push(Arc::new(RouteStage::new(resolver)));

        let invoker = match self.binders {
            Some(binders) => ControllerInvoker::with_binders(container.clone(), binders),
            None => ControllerInvoker::new(container.clone()),
        };
        let dispatch = ControllerDispatchStage::with_invoker(container.clone(), invoker);
        let pipeline = MiddlewareChainHandler::new(dispatch, stages);

        tracing::info!(
            name = %self.config.app.name,
            version = %self.config.app.version,
            environment = %self.config.app.environment,
            debug = self.config.app.debug,
            middlewares = ?pipeline.names(),
            "Kernel ready"
        );

        Ok(Kernel {
            config: self.config,
            container,
            pipeline,
            error_stage,
        })
    }
}

impl fmt::Debug for KernelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelBuilder")
            .field("config", &self.config)
            .field("middlewares", &self.middlewares.len())
            .field("listeners", &self.dispatcher.len())
            .finish_non_exhaustive()
    }
}

/// A configured application: identity, container and request pipeline.
pub struct Kernel {
    config: MicroConfig,
    container: Arc<dyn ServiceContainer>,
    error_stage: ErrorStage,
    // Everything below the error stage.
    pipeline: MiddlewareChainHandler,
}

impl Kernel {
    /// Creates a [`KernelBuilder`].
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.config.app.name
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.config.app.version
    }

    /// Deployment environment.
    pub fn environment(&self) -> &str {
        &self.config.app.environment
    }

    /// Whether error responses include developer details.
    pub fn is_debug(&self) -> bool {
        self.config.app.debug
    }

    /// The configuration the kernel was built with.
    pub fn config(&self) -> &MicroConfig {
        &self.config
    }

    /// The service container.
    pub fn container(&self) -> &Arc<dyn ServiceContainer> {
        &self.container
    }

    /// Kernel parameters, keyed `kernel.name`, `kernel.version`,
    /// `kernel.environment` and `kernel.debug`.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("kernel.name".to_string(), Value::from(self.name()));
        parameters.insert("kernel.version".to_string(), Value::from(self.version()));
        parameters.insert(
            "kernel.environment".to_string(),
            Value::from(self.environment()),
        );
        parameters.insert("kernel.debug".to_string(), Value::from(self.is_debug()));
        parameters
    }

    /// Installs the global log subscriber described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError` if the level is invalid or a subscriber is
    /// already installed.
    pub fn init_logging(&self) -> Result<(), TelemetryError> {
        micro_telemetry::init_logging(&log_config(&self.config))
    }

    /// Runs a request through the pipeline. Failures are rendered as JSON
    /// error responses, so this always yields a response.
    pub async fn handle(&self, request: Request) -> Response {
        self.error_stage.respond(request, &self.pipeline).await
    }

    /// Converts an `http::Request` and runs it through the pipeline.
    pub async fn handle_http(&self, request: http::Request<Full<Bytes>>) -> Response {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        self.handle(Request::from_http(http::Request::from_parts(parts, body)))
            .await
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("environment", &self.environment())
            .field("debug", &self.is_debug())
            .field("error_stage", &self.error_stage)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
