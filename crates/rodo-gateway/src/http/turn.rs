//! POST /api/test: runs a turn directly, bypassing webhook and transport.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use rodo_agent::TurnOutcome;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::{api_error, ApiError};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
struct TestTurnRequest {
    #[serde(rename = "senderId", alias = "phone", default)]
    sender_id: Option<String>,
    #[serde(alias = "message", default)]
    text: Option<String>,
}

pub async fn test_turn_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TurnOutcome>, ApiError> {
    let req: TestTurnRequest = serde_json::from_slice(&body).unwrap_or_default();

    let (Some(sender_id), Some(text)) = (
        req.sender_id.filter(|s| !s.is_empty()),
        req.text.filter(|t| !t.is_empty()),
    ) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "senderId and text are required",
        ));
    };

    info!(sender_id = %sender_id, "test turn");
    let outcome = state
        .orchestrator
        .process_message(&sender_id, &text)
        .await
        .map_err(|e| {
            error!(sender_id = %sender_id, error = %e, "test turn failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(outcome))
}
