//! Relay API handlers: `POST /api/server`

use crate::api::handlers::{AppError, RelayState};
use crate::relay::{RelayRequest, RelayResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::debug;

pub const MISSING_MESSAGE: &str = "Missing 'message' in request body";
pub const POST_ONLY: &str = "Only POST requests allowed";

/// POST /api/server: relay one message and return the model's reply.
///
/// Downstream failures are never surfaced: the reply is then the fallback
/// apology with a 200 status.
pub async fn relay_message(
    State(state): State<RelayState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected relay body: {}", rejection);
        AppError::BadRequest(MISSING_MESSAGE.to_string())
    })?;

    let message = request
        .message()
        .ok_or_else(|| AppError::BadRequest(MISSING_MESSAGE.to_string()))?;

    let reply = state.relay.relay(request.session_id(), message).await;

    Ok(Json(RelayResponse {
        message: reply,
        wpm: None,
    }))
}

/// Any other verb on `/api/server`
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed(POST_ONLY.to_string())
}
