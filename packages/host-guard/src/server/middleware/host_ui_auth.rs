use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Header the host's own UI sends with its capability token
pub const HOST_UI_TOKEN_HEADER: &str = "x-host-ui-token";

/// Capability held only by the trusted host UI process
///
/// Answering consent prompts requires it; a session JWT is not enough,
/// since anyone can sign in with an address they control.
#[derive(Clone)]
pub struct HostUiToken(Arc<str>);

impl HostUiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for HostUiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostUiToken([redacted])")
    }
}

/// Admit only loopback peers presenting the host UI token
pub async fn host_ui_auth_middleware(token: HostUiToken, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if !peer.is_some_and(|ip| ip.is_loopback()) {
        warn!(peer = ?peer, "Host UI request from non-loopback peer refused");
        return refuse();
    }

    let presented = request
        .headers()
        .get(HOST_UI_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(presented) if token.matches(presented) => next.run(request).await,
        _ => {
            warn!("Host UI request without a valid token refused");
            refuse()
        }
    }
}

fn refuse() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Host UI access only."})),
    )
        .into_response()
}
