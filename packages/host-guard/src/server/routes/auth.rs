use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domains::auth::{generic_messages, OtpError, UserFacingError};
use crate::kernel::ServerDeps;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct OtpRequestBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyBody {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Send a sign-in code
///
/// The response is the same whether or not the address is known.
pub async fn request_otp_handler(
    Extension(deps): Extension<ServerDeps>,
    Json(body): Json<OtpRequestBody>,
) -> Response {
    match deps.otp.request_otp(&body.email).await {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(MessageResponse {
                message: generic_messages::OTP_SENT,
            }),
        )
            .into_response(),
        Err(e) => otp_error_response(&e),
    }
}

/// Exchange a code for a session token
pub async fn verify_otp_handler(
    Extension(deps): Extension<ServerDeps>,
    Json(body): Json<OtpVerifyBody>,
) -> Response {
    let verified = match deps.otp.verify_otp(&body.email, &body.code).await {
        Ok(verified) => verified,
        Err(e) => return otp_error_response(&e),
    };

    match deps.jwt_service.create_token(&verified.identifier_hash) {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to sign session token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: generic_messages::VERIFICATION_FAILED,
                }),
            )
                .into_response()
        }
    }
}

/// End the session: its cached consent grants are revoked
pub async fn logout_handler(
    Extension(deps): Extension<ServerDeps>,
    auth_user: Option<Extension<AuthUser>>,
) -> StatusCode {
    let Some(Extension(user)) = auth_user else {
        return StatusCode::UNAUTHORIZED;
    };
    deps.gateway.clear_session_consent(&user.token_id).await;
    StatusCode::NO_CONTENT
}

/// Map an engine failure to a status and the generic message for it
fn otp_error_response(e: &OtpError) -> Response {
    let status = match e {
        OtpError::MalformedIdentifier => StatusCode::BAD_REQUEST,
        OtpError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        OtpError::IssueFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        OtpError::NoActiveOtp
        | OtpError::Expired
        | OtpError::AttemptsExhausted
        | OtpError::Mismatch { .. }
        | OtpError::Hashing(_) => StatusCode::UNAUTHORIZED,
    };
    let body: UserFacingError = e.user_message();
    (status, Json(body)).into_response()
}
