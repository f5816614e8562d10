//! End-to-end pipeline integration tests.
//!
//! These tests run requests through the full stage composition:
//!
//! 1. Error - renders failures
//! 2. Global middlewares
//! 3. Route - interprets the route-resolution result
//! 4. Dispatch - route middlewares, argument binding and the controller

use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use micro_core::{
    Arguments, Container, ControllerMethods, HandlerResult, HttpError, Parameter, Request,
    Response, Route, RouteResolution, RouteTable, ServiceContainer,
};
use micro_middleware::{
    BoxFuture, ControllerDispatchStage, ErrorDispatcher, ErrorStage, FnHandler, FnMiddleware,
    Handler, Middleware, MiddlewareChainHandler, MiddlewareRegistry, Next, RouteStage,
};
use proptest::prelude::*;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Creates a plain text response.
fn text(body: impl Into<String>) -> HandlerResult {
    Ok(http::Response::new(Full::new(Bytes::from(body.into()))))
}

/// Builds the application container.
fn container() -> Arc<dyn ServiceContainer> {
    let mut container = Container::new();
    container
        .register_controller(
            "UserController",
            ControllerMethods::new()
                .method("show", |arguments: Arguments| async move {
                    let id = arguments.text("id").unwrap_or_default().to_string();
                    let path = arguments
                        .request("request")
                        .map(|request| request.path().to_string())
                        .unwrap_or_default();
                    text(format!("user {id} via {path}"))
                })
                .method("tenant", |arguments: Arguments| async move {
                    let tenant = arguments
                        .request("request")
                        .and_then(|request| request.headers().get("x-tenant"))
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("none")
                        .to_string();
                    text(format!("tenant {tenant}"))
                })
                .method("explode", |_| async {
                    HandlerResult::Err(anyhow::anyhow!("database connection lost"))
                }),
        )
        .register_middleware("app.header", HeaderMiddleware("route"));
    Arc::new(container)
}

/// Builds the route table.
fn routes() -> RouteTable {
    RouteTable::new()
        .with(
            "users.show",
            Route::parse("UserController::show")
                .unwrap()
                .middleware("app.header")
                .parameter(Parameter::scalar("id"))
                .parameter(Parameter::request("request")),
        )
        .with(
            "users.tenant",
            Route::to("UserController", "tenant").parameter(Parameter::request("request")),
        )
        .with("users.explode", Route::to("UserController", "explode"))
        .with("ghost.show", Route::to("GhostController", "show"))
}

/// Builds the full pipeline.
fn pipeline(dispatcher: ErrorDispatcher, debug: bool) -> MiddlewareChainHandler {
    let container = container();
    let stages: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(ErrorStage::new(dispatcher).debug(debug).log_errors(false)),
        Arc::new(HeaderMiddleware("global")),
        Arc::new(RouteStage::new(Arc::new(routes()))),
    ];
    MiddlewareChainHandler::new(ControllerDispatchStage::new(container), stages)
}

fn request(method: Method, path: &str, resolution: RouteResolution) -> Request {
    Request::new(method, path.parse().unwrap()).with_route_result(resolution)
}

fn matched(identifier: &str, arguments: &[(&str, &str)]) -> RouteResolution {
    RouteResolution::matched(identifier, arguments.iter().copied().collect())
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Appends its tag to the `x-via` response header.
struct HeaderMiddleware(&'static str);

impl HeaderMiddleware {
    async fn tag(&self, request: Request, next: Next<'_>) -> HandlerResult {
        let mut response = next.run(request).await?;
        response
            .headers_mut()
            .append("x-via", HeaderValue::from_static(self.0));
        Ok(response)
    }
}

impl Middleware for HeaderMiddleware {
    fn name(&self) -> &'static str {
        self.0
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.tag(request, next))
    }
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_matched_route_invokes_controller() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);
    let response = pipeline
        .handle(request(
            Method::GET,
            "/users/42",
            matched("users.show", &[("id", "42")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let via: Vec<_> = response
        .headers()
        .get_all("x-via")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(via, vec!["route", "global"]);
    assert_eq!(body_string(response).await, "user 42 via /users/42");
}

#[tokio::test]
async fn test_global_middleware_changes_request_seen_by_controller() {
    let tenant: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("tenant", |request, next| {
        next.run(request.with_header(
            http::header::HeaderName::from_static("x-tenant"),
            HeaderValue::from_static("acme"),
        ))
    }));
    let stages: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(ErrorStage::default().log_errors(false)),
        tenant,
        Arc::new(RouteStage::new(Arc::new(routes()))),
    ];
    let tenant_pipeline =
        MiddlewareChainHandler::new(ControllerDispatchStage::new(container()), stages);

    let response = tenant_pipeline
        .handle(request(Method::GET, "/me", matched("users.tenant", &[])))
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "tenant acme");

    let untouched = pipeline(ErrorDispatcher::new(), false)
        .handle(request(Method::GET, "/me", matched("users.tenant", &[])))
        .await
        .unwrap();
    assert_eq!(body_string(untouched).await, "tenant none");
}

#[tokio::test]
async fn test_not_found_for_any_method_and_path() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);

    for (method, path) in [
        (Method::GET, "/"),
        (Method::POST, "/users"),
        (Method::DELETE, "/a/b/c?x=1"),
    ] {
        let response = pipeline
            .handle(request(method, path, RouteResolution::not_found()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["message"],
            "The requested resource could not be found. Please verify the URI and try again."
        );
    }
}

#[tokio::test]
async fn test_method_not_allowed_lists_methods() {
    let pipeline = pipeline(ErrorDispatcher::new(), true);
    let response = pipeline
        .handle(request(
            Method::DELETE,
            "/users/42",
            RouteResolution::method_not_allowed(Some("users.show".to_string()), ["GET", "POST"]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[http::header::ALLOW], "GET, POST");

    let body = body_json(response).await;
    assert_eq!(body["message"], "The request method is not supported.");
    let developer_message = body["developer_message"].as_str().unwrap();
    assert!(developer_message.contains("users.show"));
    assert!(developer_message.contains("GET, POST"));
}

#[tokio::test]
async fn test_unknown_route_identifier_is_internal_error() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);
    let response = pipeline
        .handle(request(Method::GET, "/", matched("nowhere", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "Internal Server error");
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_unregistered_controller_is_not_found() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);
    let response = pipeline
        .handle(request(Method::GET, "/ghost", matched("ghost.show", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_untyped_failure_is_teapot() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);
    let response = pipeline
        .handle(request(Method::GET, "/boom", matched("users.explode", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    let body = body_json(response).await;
    assert_eq!(body["message"], "I'm a teapot.");
    assert!(body.get("trace").is_none());
    assert!(body.get("developer_message").is_none());
}

#[tokio::test]
async fn test_untyped_failure_in_debug_mode_has_trace() {
    let pipeline = pipeline(ErrorDispatcher::new(), true);
    let response = pipeline
        .handle(request(Method::GET, "/boom", matched("users.explode", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    let body = body_json(response).await;
    assert_eq!(body["message"], "I'm a teapot.");
    assert_eq!(body["developer_message"], "database connection lost");
    assert!(!body["trace"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_listener_replacing_failure_changes_status() {
    let dispatcher = ErrorDispatcher::new().with_listener(|error: anyhow::Error| -> anyhow::Error {
        HttpError::not_found().with_source(error).into()
    });
    let pipeline = pipeline(dispatcher, false);
    let response = pipeline
        .handle(request(Method::GET, "/boom", matched("users.explode", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_equivalent_requests_are_independent() {
    let pipeline = pipeline(ErrorDispatcher::new(), false);

    let first = pipeline
        .handle(request(Method::GET, "/users/1", matched("users.show", &[("id", "1")])))
        .await
        .unwrap();
    let second = pipeline
        .handle(request(Method::GET, "/users/1", matched("users.show", &[("id", "1")])))
        .await
        .unwrap();

    assert_eq!(first.headers().get_all("x-via").iter().count(), 2);
    assert_eq!(second.headers().get_all("x-via").iter().count(), 2);
    assert_eq!(body_string(first).await, body_string(second).await);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let pipeline = Arc::new(pipeline(ErrorDispatcher::new(), false));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let id = i.to_string();
                let response = pipeline
                    .handle(request(
                        Method::GET,
                        &format!("/users/{id}"),
                        matched("users.show", &[("id", id.as_str())]),
                    ))
                    .await
                    .unwrap();
                (id, body_string(response).await)
            })
        })
        .collect();

    for task in tasks {
        let (id, body) = task.await.unwrap();
        assert_eq!(body, format!("user {id} via /users/{id}"));
    }
}

// ============================================================================
// Chain ordering properties
// ============================================================================

/// Records its index; stops the chain when it is the designated blocker.
struct Step {
    index: usize,
    blocks: bool,
    trace: Arc<Mutex<Vec<usize>>>,
}

impl Middleware for Step {
    fn name(&self) -> &'static str {
        "step"
    }

    fn process<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, HandlerResult> {
        self.trace.lock().unwrap().push(self.index);
        if self.blocks {
            return Box::pin(async { text("blocked") });
        }
        next.run(request)
    }
}

const HANDLER: usize = usize::MAX;

fn run_chain(count: usize, blocker: Option<usize>) -> Vec<usize> {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let handler_trace = trace.clone();
    let handler = FnHandler::new(move |_request| {
        handler_trace.lock().unwrap().push(HANDLER);
        async { text("handled") }
    });
    let steps = (0..count).map(|index| -> Arc<dyn Middleware> {
        Arc::new(Step {
            index,
            blocks: blocker == Some(index),
            trace: trace.clone(),
        })
    });
    let chain = MiddlewareChainHandler::new(handler, steps);

    tokio_test::block_on(chain.handle(Request::new(Method::GET, "/".parse().unwrap()))).unwrap();
    let recorded = trace.lock().unwrap().clone();
    recorded
}

proptest! {
    #[test]
    fn prop_chain_runs_in_order(count in 0usize..12) {
        let trace = run_chain(count, None);

        let mut expected: Vec<usize> = (0..count).collect();
        expected.push(HANDLER);
        prop_assert_eq!(trace, expected);
    }

    #[test]
    fn prop_short_circuit_stops_chain(count in 1usize..12, blocker in 0usize..12) {
        let blocker = blocker % count;
        let trace = run_chain(count, Some(blocker));

        let expected: Vec<usize> = (0..=blocker).collect();
        prop_assert_eq!(trace, expected);
    }
}
