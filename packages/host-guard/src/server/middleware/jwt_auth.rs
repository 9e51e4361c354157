use crate::domains::auth::{JwtService, SessionTokenError};
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Session holder from a verified JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    /// Identifier hash the session was issued for
    pub subject: String,
    /// Token ID, for audit logs
    pub token_id: String,
}

/// Attach an [`AuthUser`] to requests carrying a valid session token.
///
/// Requests without one pass through untouched; handlers decide whether a
/// session is required.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match jwt_service.verify_token(token) {
            Ok(claims) => {
                debug!(token_id = %claims.jti, "Authenticated session");
                request.extensions_mut().insert(AuthUser {
                    subject: claims.sub,
                    token_id: claims.jti,
                });
            }
            Err(SessionTokenError::Expired) => debug!("Ignoring expired session token"),
            Err(e) => debug!(error = %e, "Ignoring invalid session token"),
        }
    }

    next.run(request).await
}

/// `Authorization: Bearer <token>`, or the bare token
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}
