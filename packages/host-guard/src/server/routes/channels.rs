use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains::channels::{GatewayError, Grant, RequesterContext};
use crate::kernel::ServerDeps;
use crate::server::middleware::{AuthUser, ClientIp};

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub payload: Option<Value>,
    /// Human-readable label; sets consent granularity
    #[serde(default)]
    pub operation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<Grant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

const SESSION_REQUIRED: &str = "Sign in to use host channels.";

/// Ask the gateway whether the caller may run `name`
///
/// Requires a session; "always allow" grants are scoped to it. May wait on
/// the user when the channel needs consent. Rejection reasons are redacted
/// before they leave the process.
pub async fn authorize_handler(
    Extension(deps): Extension<ServerDeps>,
    auth_user: Option<Extension<AuthUser>>,
    client_ip: Option<Extension<ClientIp>>,
    Path(name): Path<String>,
    Json(body): Json<AuthorizeRequest>,
) -> (StatusCode, Json<AuthorizeResponse>) {
    let Some(Extension(user)) = auth_user else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthorizeResponse {
                authorized: false,
                grant: None,
                reason: Some(SESSION_REQUIRED.to_string()),
            }),
        );
    };

    let requester = client_ip
        .map(|Extension(ClientIp(ip))| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut ctx = RequesterContext::new(requester).with_session(user.token_id);
    ctx.operation = body.operation;

    match deps
        .gateway
        .authorize(&name, body.payload.as_ref(), &ctx)
        .await
    {
        Ok(grant) => (
            StatusCode::OK,
            Json(AuthorizeResponse {
                authorized: true,
                grant: Some(grant),
                reason: None,
            }),
        ),
        Err(e) => {
            let status = match e {
                GatewayError::UserDenied { .. } => StatusCode::FORBIDDEN,
                GatewayError::UnknownChannel(_) | GatewayError::PayloadSchemaViolation { .. } => {
                    StatusCode::BAD_REQUEST
                }
            };
            (
                status,
                Json(AuthorizeResponse {
                    authorized: false,
                    grant: None,
                    reason: Some(e.boundary_message()),
                }),
            )
        }
    }
}
