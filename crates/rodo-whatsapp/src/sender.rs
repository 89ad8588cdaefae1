use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WhatsAppError;

/// A quick-reply button on an interactive message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

impl ReplyButton {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Delivery confirmation returned by the messaging API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub contacts: Vec<ReceiptContact>,
    #[serde(default)]
    pub messages: Vec<ReceiptMessage>,
}

impl SendReceipt {
    /// Id of the first accepted message, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptContact {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub wa_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptMessage {
    pub id: String,
}

/// Outbound side of the messaging platform.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by every request handler.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Stable lowercase identifier for logs (e.g. `"kapso"`).
    fn name(&self) -> &str;

    /// Send a plain text message.
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, WhatsAppError>;

    /// Send a message with quick-reply buttons.
    async fn send_interactive(
        &self,
        to: &str,
        body: &str,
        buttons: &[ReplyButton],
    ) -> Result<SendReceipt, WhatsAppError>;

    /// Mark an inbound message as read (blue ticks).
    async fn mark_read(&self, message_id: &str) -> Result<(), WhatsAppError>;
}
