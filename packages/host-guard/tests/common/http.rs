//! Helpers for driving the routers in-process.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use host_guard_core::server::middleware::HOST_UI_TOKEN_HEADER;
use serde_json::Value;
use tower::ServiceExt;

/// Upper bound on response bodies read in tests
const MAX_BODY: usize = 64 * 1024;

/// Response status plus the body parsed as JSON (`Value::Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> TestResponse {
    let request = with_auth(Request::get(uri), token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
    post_json_with_headers(app, uri, body, token, &[]).await
}

/// `post_json` plus extra raw headers
pub async fn post_json_with_headers(
    app: Router,
    uri: &str,
    body: Value,
    token: Option<&str>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = with_auth(Request::post(uri), token).header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(app, request).await
}

/// GET on the host UI router, presenting `ui_token` when given
pub async fn host_ui_get(app: Router, uri: &str, ui_token: Option<&str>) -> TestResponse {
    let request = with_host_ui_token(Request::get(uri), ui_token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST on the host UI router, presenting `ui_token` when given
pub async fn host_ui_post(
    app: Router,
    uri: &str,
    body: Value,
    ui_token: Option<&str>,
) -> TestResponse {
    let request = with_host_ui_token(Request::post(uri), ui_token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn with_auth(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {}", token)),
        None => builder,
    }
}

fn with_host_ui_token(
    builder: axum::http::request::Builder,
    ui_token: Option<&str>,
) -> axum::http::request::Builder {
    match ui_token {
        Some(ui_token) => builder.header(HOST_UI_TOKEN_HEADER, ui_token),
        None => builder,
    }
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse { status, body }
}
