//! WhatsApp webhook: GET verification handshake and POST message delivery.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use rodo_whatsapp::{signature, WebhookPayload};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{api_error, ApiError};
use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /api/webhook
///
/// Echoes `hub.challenge` when the mode is `subscribe` and the token matches
/// the configured secret. Anything else is 403.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, ApiError> {
    let token_ok = match (state.webhook_secret(), params.verify_token.as_deref()) {
        (Some(secret), Some(token)) => secret == token,
        _ => false,
    };

    if params.mode.as_deref() == Some("subscribe") && token_ok {
        info!("webhook verified");
        return Ok(params.challenge.unwrap_or_default());
    }

    warn!(mode = ?params.mode, "webhook verification rejected");
    Err(api_error(StatusCode::FORBIDDEN, "Forbidden"))
}

/// POST /api/webhook
///
/// Verifies the signature over the raw body when both a secret is configured
/// and the request carries a signature header, then normalises the payload and, for
/// a user message, runs one turn and relays the reply. Status callbacks and
/// unrecognised payloads are acknowledged without doing anything.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let presented = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    match (state.webhook_secret(), presented) {
        (Some(secret), Some(sig)) => {
            if !signature::verify(&body, sig, secret) {
                warn!(bytes = body.len(), "webhook signature rejected");
                return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid signature"));
            }
        }
        (Some(_), None) => debug!("unsigned webhook, signature check skipped"),
        (None, _) => {}
    }

    let payload = WebhookPayload::parse(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in webhook body");
        api_error(StatusCode::BAD_REQUEST, "Invalid JSON body")
    })?;

    let Some(inbound) = payload.extract() else {
        debug!(shape = payload.shape(), "webhook carried no inbound message");
        return Ok(ok());
    };

    info!(
        from = %inbound.from,
        shape = payload.shape(),
        message_id = %inbound.message_id,
        "inbound message"
    );

    if !inbound.message_id.is_empty() {
        if let Err(e) = state.sender.mark_read(&inbound.message_id).await {
            warn!(error = %e, message_id = %inbound.message_id, "mark_read failed");
        }
    }

    let outcome = state
        .orchestrator
        .process_message(&inbound.from, &inbound.text)
        .await
        .map_err(|e| {
            error!(from = %inbound.from, error = %e, "turn failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    state
        .sender
        .send_text(&inbound.from, &outcome.content)
        .await
        .map_err(|e| {
            error!(to = %inbound.from, sender = state.sender.name(), error = %e, "reply send failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    info!(to = %inbound.from, tokens_used = outcome.tokens_used, "reply sent");
    Ok(ok())
}

fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
