use axum::{
    routing::{get, post},
    Router,
};
use rodo_agent::TurnOrchestrator;
use rodo_core::config::RodoConfig;
use rodo_store::ConversationStore;
use rodo_whatsapp::MessageSender;
use std::sync::Arc;

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
///
/// Every external client is constructed at startup and injected here.
pub struct AppState {
    pub config: RodoConfig,
    pub store: Arc<ConversationStore>,
    pub orchestrator: Arc<TurnOrchestrator>,
    pub sender: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn new(
        config: RodoConfig,
        store: Arc<ConversationStore>,
        orchestrator: Arc<TurnOrchestrator>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
            sender,
        }
    }

    /// Configured webhook secret, treating an empty string as unset.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.whatsapp.webhook_secret()
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/webhook",
            get(crate::http::webhook::verify_handler).post(crate::http::webhook::webhook_handler),
        )
        .route("/api/test", post(crate::http::turn::test_turn_handler))
        .route("/api/health", get(crate::http::health::health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
