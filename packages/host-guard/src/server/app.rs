//! Application setup and server configuration.
//!
//! Two routers. The public one faces the untrusted UI (channels, sign-in).
//! The host UI one carries the consent queue and is served on a loopback
//! listener behind [`HostUiToken`], so a requester can never answer its own
//! prompt.

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::{
    extract_client_ip, host_ui_auth_middleware, jwt_auth_middleware, HostUiToken, TrustedProxies,
};
use crate::server::routes::{
    authorize_handler, dismiss_handler, health_handler, list_pending_handler, logout_handler,
    request_otp_handler, respond_handler, verify_otp_handler,
};

/// Build the public Axum router
///
/// Requests are served with `into_make_service_with_connect_info::<SocketAddr>()`;
/// the throttle and the client IP both come from the socket address.
/// Forwarding headers count only when the peer is one of `trusted_proxies`.
pub fn build_app(deps: ServerDeps, trusted_proxies: TrustedProxies) -> Router {
    // CORS configuration - the UI only ever reads and posts
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Clone jwt_service for middleware closure
    let jwt_service_for_middleware = deps.jwt_service.clone();

    // Coarse per-peer throttle: one request replenished every 100ms, bursts
    // of 20. The per-email OTP budget is enforced by the engine, not here.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(100)
            .burst_size(20)
            .use_headers() // x-ratelimit-* response headers
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/channels/:name/authorize", post(authorize_handler))
        .route("/auth/otp/request", post(request_otp_handler))
        .route("/auth/otp/verify", post(verify_otp_handler))
        .route("/auth/logout", post(logout_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service_for_middleware.clone(), req, next)
        }))
        .layer(rate_limit_layer)
        .layer(middleware::from_fn(move |req, next| {
            extract_client_ip(trusted_proxies.clone(), req, next)
        }))
        .layer(Extension(deps))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the host UI router: the consent queue, nothing else
///
/// No CORS layer, so browsers will not let other origins call it.
pub fn build_host_ui_app(deps: ServerDeps, token: HostUiToken) -> Router {
    Router::new()
        .route("/consent/pending", get(list_pending_handler))
        .route("/consent/:id", post(respond_handler))
        .route("/consent/:id/dismiss", post(dismiss_handler))
        .layer(middleware::from_fn(move |req, next| {
            host_ui_auth_middleware(token.clone(), req, next)
        }))
        .layer(Extension(deps))
        .layer(TraceLayer::new_for_http())
}
