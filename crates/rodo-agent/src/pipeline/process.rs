//! The turn orchestrator.
//!
//! One call handles one inbound message:
//! resolve producer → resolve conversation → load recent window →
//! persist the user message → build prompt → generate → persist the reply.
//!
//! Errors propagate unchanged. A failed generation leaves the user message
//! stored with no reply; nothing is rolled back.

use std::sync::Arc;

use rodo_core::config::AgentConfig;
use rodo_core::types::MessageRole;
use rodo_store::{ConversationStore, StoreError};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::market::{MarketContextSource, MarketError};
use crate::prompt::PromptTemplate;
use crate::provider::{ChatRequest, LlmProvider, Message, ProviderError};

use super::context::{conversation_history, producer_context};

/// Result of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub content: String,
    /// Total tokens reported by the backend, 0 when unavailable.
    pub tokens_used: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("generation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("market context unavailable: {0}")]
    Market(#[from] MarketError),
}

/// Stateless across turns; all session state lives in the store.
pub struct TurnOrchestrator {
    store: Arc<ConversationStore>,
    provider: Box<dyn LlmProvider>,
    market: Box<dyn MarketContextSource>,
    template: PromptTemplate,
    model: String,
    max_tokens: u32,
    history_window: usize,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        provider: Box<dyn LlmProvider>,
        market: Box<dyn MarketContextSource>,
        template: PromptTemplate,
        agent: &AgentConfig,
    ) -> Self {
        Self {
            store,
            provider,
            market,
            template,
            model: agent.model.clone(),
            max_tokens: agent.max_tokens,
            history_window: agent.history_window,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one turn for `sender_id` and return the generated reply.
    #[instrument(skip(self, text), fields(provider = self.provider.name()))]
    pub async fn process_message(
        &self,
        sender_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let resolved = self.store.resolve_producer(sender_id)?;
        if resolved.is_new() {
            info!(sender_id, "first message from producer");
        }
        let producer = resolved.into_producer();

        let conversation = self.store.resolve_active_conversation(&producer.id)?;

        // Loaded before the append so the current text is not replayed as history.
        let recent = self
            .store
            .recent_messages(&conversation.id, self.history_window)?;

        self.store
            .append_message(&conversation.id, MessageRole::User, text)?;

        let market = self.market.current_context().await?;
        let system = self.template.render(
            &market,
            &producer_context(&producer),
            &conversation_history(&recent),
        );
        debug!(
            conversation_id = %conversation.id,
            history = recent.len(),
            prompt_chars = system.len(),
            "prompt assembled"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            system,
            messages: vec![Message::user(text)],
            max_tokens: self.max_tokens,
        };
        let response = self.provider.send(&request).await?;

        self.store
            .append_message(&conversation.id, MessageRole::Assistant, &response.content)?;

        info!(
            conversation_id = %conversation.id,
            tokens_in = response.tokens_in,
            tokens_out = response.tokens_out,
            tokens_used = response.total_tokens,
            "turn complete"
        );

        Ok(TurnOutcome {
            content: response.content,
            tokens_used: response.total_tokens,
        })
    }
}
