use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;

/// GET /api/health: liveness, store round-trip and credential presence.
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = state.store.ping() {
        error!(error = %e, "health check: store unreachable");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "unhealthy", "error": e.to_string() })),
        );
    }

    let wa = &state.config.whatsapp;
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "services": {
                "database": "connected",
                "whatsapp": presence(!wa.api_key.is_empty() && !wa.phone_number_id.is_empty()),
                "gemini": presence(!state.config.providers.gemini.api_key.is_empty()),
                "webhook_secret": presence(state.webhook_secret().is_some()),
            },
        })),
    )
}

fn presence(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "missing"
    }
}
