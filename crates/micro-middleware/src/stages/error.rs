//! Error boundary stage.
//!
//! The outermost stage of the pipeline. Every failure raised further down is
//! caught here, passed through the [`ErrorDispatcher`], converted to an
//! [`HttpError`] and rendered as a JSON response. This stage never fails.
//!
//! # Payload
//!
//! ```json
//! {
//!   "message": "The request method is not supported.",
//!   "developer_message": "Allowed methods users.show: GET, HEAD",
//!   "trace": "HTTP 405: ...",
//!   "code": 1042
//! }
//! ```
//!
//! `developer_message` and `trace` are only included in debug mode, `code`
//! only when it is non-zero. Failures that are not `HttpError`s are rendered
//! as 418 responses, so their details never reach the client outside debug
//! mode. A panic raised below this stage is caught and rendered the same
//! way, with the panic message as the developer message.
//!
//! # Example
//!
//! ```rust
//! use micro_middleware::{ErrorDispatcher, ErrorStage};
//!
//! let stage = ErrorStage::new(ErrorDispatcher::new())
//!     .debug(true)
//!     .log_errors(false);
//! ```

use crate::events::ErrorDispatcher;
use crate::middleware::{Handler, Middleware, Next};
use bytes::Bytes;
use futures_util::FutureExt;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http_body_util::Full;
use micro_core::{BoxFuture, HandlerResult, HttpError, Request, RequestId, Response};
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Renders pipeline failures as JSON error responses.
#[derive(Debug, Clone)]
pub struct ErrorStage {
    dispatcher: ErrorDispatcher,
    debug: bool,
    log_errors: bool,
}

impl Default for ErrorStage {
    fn default() -> Self {
        Self::new(ErrorDispatcher::new())
    }
}

impl ErrorStage {
    /// Creates an error stage. Debug output is off, error logging on.
    #[must_use]
    pub fn new(dispatcher: ErrorDispatcher) -> Self {
        Self {
            dispatcher,
            debug: false,
            log_errors: true,
        }
    }

    /// Sets whether developer messages and traces are included.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets whether failures are logged.
    #[must_use]
    pub fn log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    /// Converts a failure into the response sent to the client.
    pub fn render(&self, failure: anyhow::Error, request_id: RequestId) -> Response {
        if self.log_errors {
            tracing::error!(
                error = ?failure,
                request_id = %request_id,
                "Request failed"
            );
        }

        let failure = self.dispatcher.dispatch(failure);
        let error = HttpError::from_failure(failure);

        let mut payload = error.data();
        if self.debug {
            if let Some(message) = error.developer_message() {
                payload.insert("developer_message".to_string(), Value::String(message));
            }
            payload.insert("trace".to_string(), Value::String(error.trace()));
        }
        if error.code() != 0 {
            payload.insert("code".to_string(), Value::from(error.code()));
        }

        let body = Value::Object(payload).to_string();
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = error.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let allowed = error.allowed_methods();
        if !allowed.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(ALLOW, value);
            }
        }

        response
    }

    /// Runs `handler` behind this stage and always returns a response.
    pub async fn respond<H: Handler + ?Sized>(&self, request: Request, handler: &H) -> Response {
        let request_id = request.request_id();
        self.shield(request_id, handler.handle(request)).await
    }

    async fn shield<F>(&self, request_id: RequestId, outcome: F) -> Response
    where
        F: Future<Output = HandlerResult>,
    {
        match AssertUnwindSafe(outcome).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(failure)) => self.render(failure, request_id),
            Err(panic) => self.render(panic_failure(&*panic), request_id),
        }
    }

    async fn guard(&self, request: Request, next: Next<'_>) -> HandlerResult {
        let request_id = request.request_id();
        Ok(self.shield(request_id, next.run(request)).await)
    }
}

fn panic_failure(panic: &(dyn Any + Send)) -> anyhow::Error {
    let message = panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    anyhow::anyhow!("handler panicked: {message}")
}

impl Middleware for ErrorStage {
    fn name(&self) -> &'static str {
        "error"
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.guard(request, next))
    }
}
