//! HTTP error types for Micro.
//!
//! This module provides the [`HttpError`] type, the terminal failure family of
//! the request pipeline. Every failure that reaches the error boundary is
//! either an `HttpError` already or is demoted to one (a 418 fallback that
//! keeps the original failure as its cause).
//!
//! # Payload
//!
//! An `HttpError` carries a structured JSON payload that is serialized into
//! the response body:
//!
//! ```json
//! {
//!   "message": "The requested resource could not be found. Please verify the URI and try again."
//! }
//! ```
//!
//! | Kind | Status | Default payload message |
//! |---|---|---|
//! | `Generic` | 500 | `Internal Server error` |
//! | `BadRequest` | 400 | `The request is badly performed.` |
//! | `Conflict` | 409 | the conflict description |
//! | `MethodNotAllowed` | 405 | `The request method is not supported.` |
//! | `NotFound` | 404 | `The requested resource could not be found. Please verify the URI and try again.` |
//! | `Teapot` | 418 | `I'm a teapot.` |
//! | `UnprocessableEntity` | 422 | `Unprocessable entity.` (plus `errors`) |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Default payload message of a generic [`HttpError`].
pub const DEFAULT_MESSAGE: &str = "Internal Server error";

const BAD_REQUEST_MESSAGE: &str = "The request is badly performed.";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "The request method is not supported.";
const NOT_FOUND_MESSAGE: &str =
    "The requested resource could not be found. Please verify the URI and try again.";
const TEAPOT_MESSAGE: &str = "I'm a teapot.";
const UNPROCESSABLE_ENTITY_MESSAGE: &str = "Unprocessable entity.";

/// A field-level validation error carried by an unprocessable-entity error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path of the offending field.
    pub field: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Attaches a machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut value = serde_json::json!({
            "field": self.field,
            "message": self.message,
        });
        if let (Some(code), Value::Object(map)) = (&self.code, &mut value) {
            map.insert("code".to_string(), Value::String(code.clone()));
        }
        value
    }
}

/// The kind of an [`HttpError`], fixing its status and payload defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// Any status with a caller-provided payload.
    Generic,
    /// 400 Bad Request.
    BadRequest,
    /// 409 Conflict.
    Conflict,
    /// 405 Method Not Allowed.
    MethodNotAllowed {
        /// Methods the matched resource accepts, in the order given.
        allowed_methods: Vec<String>,
    },
    /// 404 Not Found.
    NotFound,
    /// 418 I'm a teapot, the catch-all fallback.
    Teapot,
    /// 422 Unprocessable Entity.
    UnprocessableEntity {
        /// Field errors, in input order, duplicates preserved.
        errors: Vec<FieldError>,
    },
}

/// A typed failure carrying an HTTP status code and a structured payload.
///
/// # Example
///
/// ```
/// use micro_core::HttpError;
/// use http::StatusCode;
///
/// let error = HttpError::not_found().with_message("no user 42");
/// assert_eq!(error.status(), StatusCode::NOT_FOUND);
/// assert_eq!(error.message(), "no user 42");
/// ```
#[derive(Debug)]
pub struct HttpError {
    kind: HttpErrorKind,
    status: StatusCode,
    data: Map<String, Value>,
    message: String,
    code: i64,
    source: Option<anyhow::Error>,
}

impl HttpError {
    /// Creates a generic error with the given status and payload.
    pub fn new(status: StatusCode, data: Map<String, Value>) -> Self {
        Self::with_kind(HttpErrorKind::Generic, status, data)
    }

    /// Creates a generic 500 error with the default payload.
    pub fn internal() -> Self {
        Self::with_kind(
            HttpErrorKind::Generic,
            StatusCode::INTERNAL_SERVER_ERROR,
            message_payload(DEFAULT_MESSAGE),
        )
    }

    /// Creates a 400 error.
    pub fn bad_request() -> Self {
        Self::with_kind(
            HttpErrorKind::BadRequest,
            StatusCode::BAD_REQUEST,
            message_payload(BAD_REQUEST_MESSAGE),
        )
    }

    /// Creates a 409 error whose payload message is the conflict description.
    pub fn conflict(conflict: impl Into<String>) -> Self {
        Self::with_kind(
            HttpErrorKind::Conflict,
            StatusCode::CONFLICT,
            message_payload(conflict.into()),
        )
    }

    /// Creates a 405 error listing the allowed methods.
    pub fn method_not_allowed<I, S>(allowed_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(
            HttpErrorKind::MethodNotAllowed {
                allowed_methods: allowed_methods.into_iter().map(Into::into).collect(),
            },
            StatusCode::METHOD_NOT_ALLOWED,
            message_payload(METHOD_NOT_ALLOWED_MESSAGE),
        )
    }

    /// Creates a 404 error.
    pub fn not_found() -> Self {
        Self::with_kind(
            HttpErrorKind::NotFound,
            StatusCode::NOT_FOUND,
            message_payload(NOT_FOUND_MESSAGE),
        )
    }

    /// Creates a 418 error.
    pub fn teapot() -> Self {
        Self::with_kind(
            HttpErrorKind::Teapot,
            StatusCode::IM_A_TEAPOT,
            message_payload(TEAPOT_MESSAGE),
        )
    }

    /// Creates a 422 error carrying field errors.
    pub fn unprocessable_entity(errors: Vec<FieldError>) -> Self {
        Self::with_kind(
            HttpErrorKind::UnprocessableEntity { errors },
            StatusCode::UNPROCESSABLE_ENTITY,
            message_payload(UNPROCESSABLE_ENTITY_MESSAGE),
        )
    }

    /// Converts an arbitrary pipeline failure into an `HttpError`.
    ///
    /// A failure that already is an `HttpError` is returned as is. Anything
    /// else becomes a 418 error with the original failure as its cause, so
    /// internal error shapes never reach the client payload.
    pub fn from_failure(failure: anyhow::Error) -> Self {
        match failure.downcast::<Self>() {
            Ok(error) => error,
            Err(other) => Self::teapot().with_source(other),
        }
    }

    fn with_kind(kind: HttpErrorKind, status: StatusCode, data: Map<String, Value>) -> Self {
        Self {
            kind,
            status,
            data,
            message: String::new(),
            code: 0,
            source: None,
        }
    }

    /// Sets the developer-facing message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the application error code (distinct from the HTTP status).
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Sets the underlying cause.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a type-specific field to the payload.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Merges the given fields into the payload, overwriting existing keys.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data.extend(data);
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &HttpErrorKind {
        &self.kind
    }

    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the structured payload.
    ///
    /// For unprocessable-entity errors the `errors` list is merged in here,
    /// at read time.
    pub fn data(&self) -> Map<String, Value> {
        let mut data = self.data.clone();
        if let HttpErrorKind::UnprocessableEntity { errors } = &self.kind {
            data.insert(
                "errors".to_string(),
                Value::Array(errors.iter().map(FieldError::to_json).collect()),
            );
        }
        data
    }

    /// Returns the developer-facing message (empty by default).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the application error code (0 when unset).
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Returns the allowed methods of a 405 error, empty for other kinds.
    pub fn allowed_methods(&self) -> &[String] {
        match &self.kind {
            HttpErrorKind::MethodNotAllowed { allowed_methods } => allowed_methods,
            _ => &[],
        }
    }

    /// Returns the field errors of a 422 error, empty for other kinds.
    pub fn field_errors(&self) -> &[FieldError] {
        match &self.kind {
            HttpErrorKind::UnprocessableEntity { errors } => errors,
            _ => &[],
        }
    }

    /// Returns the message meant for developers.
    ///
    /// This is the error's own message, or the cause's message when the
    /// former is empty. `None` when both are empty.
    pub fn developer_message(&self) -> Option<String> {
        if !self.message.is_empty() {
            return Some(self.message.clone());
        }
        self.source
            .as_ref()
            .map(ToString::to_string)
            .filter(|message| !message.is_empty())
    }

    /// Returns a full diagnostic string: the error, its cause chain and the
    /// cause's backtrace when one was captured.
    pub fn trace(&self) -> String {
        let mut trace = self.to_string();
        if let Some(source) = &self.source {
            trace.push_str("\n\nCaused by: ");
            trace.push_str(&format!("{source:?}"));
        }
        trace
    }

    fn payload_message(&self) -> &str {
        self.data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MESSAGE)
    }
}

impl Default for HttpError {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.payload_message())?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| {
            let source: &(dyn std::error::Error + 'static) = source.as_ref();
            source
        })
    }
}

fn message_payload(message: impl Into<String>) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("message".to_string(), Value::String(message.into()));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_internal_defaults() {
        let error = HttpError::internal();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.data()["message"], DEFAULT_MESSAGE);
        assert_eq!(error.message(), "");
        assert_eq!(error.code(), 0);
        assert!(error.cause().is_none());
        assert_eq!(*error.kind(), HttpErrorKind::Generic);
    }

    #[test]
    fn test_fixed_status_codes() {
        let cases = [
            (HttpError::bad_request(), 400, BAD_REQUEST_MESSAGE),
            (HttpError::conflict("email taken"), 409, "email taken"),
            (HttpError::method_not_allowed(["GET"]), 405, METHOD_NOT_ALLOWED_MESSAGE),
            (HttpError::not_found(), 404, NOT_FOUND_MESSAGE),
            (HttpError::teapot(), 418, TEAPOT_MESSAGE),
            (HttpError::unprocessable_entity(vec![]), 422, UNPROCESSABLE_ENTITY_MESSAGE),
        ];

        for (error, status, message) in cases {
            assert_eq!(error.status().as_u16(), status);
            assert_eq!(error.data()["message"], message);
        }
    }

    #[test]
    fn test_generic_error_keeps_payload() {
        let mut data = Map::new();
        data.insert("message".to_string(), Value::from("Gone for good"));
        data.insert("since".to_string(), Value::from("2024-01-01"));

        let error = HttpError::new(StatusCode::GONE, data);
        assert_eq!(error.status(), StatusCode::GONE);
        assert_eq!(error.data()["since"], "2024-01-01");
    }

    #[test]
    fn test_unprocessable_entity_merges_errors_at_read_time() {
        let error = HttpError::unprocessable_entity(vec![
            FieldError::new("email", "Invalid format"),
            FieldError::new("email", "Must not be empty").with_code("required"),
            FieldError::new("name", "Too long"),
        ]);

        let data = error.data();
        let errors = data["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0]["field"], "email");
        assert_eq!(errors[1]["message"], "Must not be empty");
        assert_eq!(errors[1]["code"], "required");
        assert!(errors[0].get("code").is_none());
        assert_eq!(errors[2]["field"], "name");

        // Stored payload does not contain the computed key.
        assert!(!error.data.contains_key("errors"));
        assert_eq!(error.field_errors().len(), 3);
    }

    #[test]
    fn test_method_not_allowed_keeps_order() {
        let error = HttpError::method_not_allowed(["POST", "GET"]);
        assert_eq!(error.allowed_methods(), ["POST", "GET"]);
        assert!(HttpError::not_found().allowed_methods().is_empty());
    }

    #[test]
    fn test_with_field_adds_payload_entry() {
        let error = HttpError::conflict("duplicate").with_field("resource", "user");
        let data = error.data();
        assert_eq!(data["message"], "duplicate");
        assert_eq!(data["resource"], "user");
    }

    #[test]
    fn test_from_failure_keeps_http_errors() {
        let failure: anyhow::Error = HttpError::not_found().with_code(7).into();
        let error = HttpError::from_failure(failure);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.code(), 7);
    }

    #[test]
    fn test_from_failure_wraps_unknown_errors() {
        let failure = anyhow::anyhow!("database exploded");
        let error = HttpError::from_failure(failure);
        assert_eq!(error.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(error.data()["message"], TEAPOT_MESSAGE);
        assert_eq!(error.cause().unwrap().to_string(), "database exploded");
        assert_eq!(error.source().unwrap().to_string(), "database exploded");
    }

    #[test]
    fn test_developer_message_prefers_own_message() {
        let error = HttpError::teapot()
            .with_message("own")
            .with_source(anyhow::anyhow!("cause"));
        assert_eq!(error.developer_message().as_deref(), Some("own"));

        let error = HttpError::teapot().with_source(anyhow::anyhow!("cause"));
        assert_eq!(error.developer_message().as_deref(), Some("cause"));

        assert!(HttpError::teapot().developer_message().is_none());
    }

    #[test]
    fn test_trace_mentions_cause() {
        let error = HttpError::teapot().with_source(anyhow::anyhow!("disk full"));
        let trace = error.trace();
        assert!(trace.starts_with("HTTP 418"));
        assert!(trace.contains("disk full"));

        assert!(!HttpError::not_found().trace().is_empty());
    }

    #[test]
    fn test_display() {
        let error = HttpError::bad_request().with_message("missing id");
        assert_eq!(
            error.to_string(),
            "HTTP 400: The request is badly performed. (missing id)"
        );
    }
}
