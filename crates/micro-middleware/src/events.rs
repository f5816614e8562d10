//! Error listeners.
//!
//! Before the error stage renders a failure it passes it through the
//! listeners registered for [`ERROR_EVENT`]. Each listener receives the
//! current failure and returns the one to continue with, so a listener can
//! observe a failure (return it unchanged) or replace it (for example, map a
//! domain error to an [`HttpError`](micro_core::HttpError)).

use std::fmt;
use std::sync::Arc;

/// Name of the event dispatched when a request fails.
pub const ERROR_EVENT: &str = "middleware.error";

/// Rewrites a failure on its way to the error stage.
pub trait ErrorListener: Send + Sync + 'static {
    /// Returns the failure to continue with.
    fn on_error(&self, error: anyhow::Error) -> anyhow::Error;
}

impl<F> ErrorListener for F
where
    F: Fn(anyhow::Error) -> anyhow::Error + Send + Sync + 'static,
{
    fn on_error(&self, error: anyhow::Error) -> anyhow::Error {
        self(error)
    }
}

/// Runs error listeners in registration order.
///
/// # Example
///
/// ```
/// use micro_core::HttpError;
/// use micro_middleware::ErrorDispatcher;
///
/// let mut dispatcher = ErrorDispatcher::new();
/// dispatcher.listen(|error: anyhow::Error| {
///     if error.is::<std::num::ParseIntError>() {
///         HttpError::bad_request().with_source(error).into()
///     } else {
///         error
///     }
/// });
///
/// let failure = "x".parse::<u32>().unwrap_err();
/// let error = dispatcher.dispatch(failure.into());
/// assert!(error.is::<HttpError>());
/// ```
#[derive(Clone, Default)]
pub struct ErrorDispatcher {
    listeners: Vec<Arc<dyn ErrorListener>>,
}

impl ErrorDispatcher {
    /// Creates a dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener after the existing ones.
    pub fn listen(&mut self, listener: impl ErrorListener) -> &mut Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Builder-style [`listen`](Self::listen).
    #[must_use]
    pub fn with_listener(mut self, listener: impl ErrorListener) -> Self {
        self.listen(listener);
        self
    }

    /// Registers an already shared listener.
    pub fn listen_shared(&mut self, listener: Arc<dyn ErrorListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    /// Passes `error` through every listener and returns the final failure.
    pub fn dispatch(&self, error: anyhow::Error) -> anyhow::Error {
        self.listeners
            .iter()
            .fold(error, |error, listener| listener.on_error(error))
    }

    /// Returns the number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ErrorDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDispatcher")
            .field("event", &ERROR_EVENT)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
