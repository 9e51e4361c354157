//! Consent queue for the host's own UI. Served only on the host UI router.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domains::channels::ConsentDecision;
use crate::kernel::{PendingConsent, ServerDeps};

#[derive(Debug, Deserialize)]
pub struct ConsentAnswer {
    pub decision: ConsentDecision,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
}

const NOT_PENDING: &str = "No such pending consent request.";

/// Consent prompts awaiting an answer, oldest first
pub async fn list_pending_handler(Extension(deps): Extension<ServerDeps>) -> Response {
    let pending: Vec<PendingConsent> = deps.consent_broker.list_pending().await;
    (StatusCode::OK, Json(pending)).into_response()
}

/// Answer a consent prompt
pub async fn respond_handler(
    Extension(deps): Extension<ServerDeps>,
    Path(id): Path<Uuid>,
    Json(answer): Json<ConsentAnswer>,
) -> Response {
    match deps.consent_broker.respond(id, answer.decision).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            debug!(request_id = %id, error = %e, "Consent answer not applied");
            not_pending()
        }
    }
}

/// Close a consent prompt without a choice; the requester is denied
pub async fn dismiss_handler(
    Extension(deps): Extension<ServerDeps>,
    Path(id): Path<Uuid>,
) -> Response {
    match deps.consent_broker.dismiss(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            debug!(request_id = %id, error = %e, "Consent dismissal not applied");
            not_pending()
        }
    }
}

fn not_pending() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            message: NOT_PENDING,
        }),
    )
        .into_response()
}
