//! Kapso proxy client for the WhatsApp Cloud API.
//!
//! Constructed once at startup from config and shared behind
//! `Arc<dyn MessageSender>`; construction fails when credentials are empty.

use async_trait::async_trait;
use rodo_core::config::WhatsAppConfig;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{truncate_chars, WhatsAppError, ERROR_BODY_MAX};
use crate::sender::{MessageSender, ReplyButton, SendReceipt};

const API_KEY_HEADER: &str = "x-kapso-api-key";

pub struct KapsoClient {
    client: reqwest::Client,
    api_key: String,
    messages_url: String,
}

impl KapsoClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, WhatsAppError> {
        if config.api_key.trim().is_empty() {
            return Err(WhatsAppError::MissingCredential("whatsapp.api_key"));
        }
        if config.phone_number_id.trim().is_empty() {
            return Err(WhatsAppError::MissingCredential("whatsapp.phone_number_id"));
        }

        let messages_url = format!(
            "{}/{}/{}/messages",
            config.base_url.trim_end_matches('/'),
            config.api_version,
            config.phone_number_id
        );

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            messages_url,
        })
    }

    /// Full URL messages are posted to.
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// POST a body to the messages endpoint and return the raw response text.
    async fn post(&self, body: &Value) -> Result<String, WhatsAppError> {
        let resp = self
            .client
            .post(&self.messages_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(
            status = status.as_u16(),
            body = %truncate_chars(&text, 500),
            "kapso response"
        );

        if !status.is_success() {
            warn!(status = status.as_u16(), "Kapso API error");
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                message: truncate_chars(&text, ERROR_BODY_MAX),
            });
        }
        Ok(text)
    }

    async fn post_for_receipt(&self, body: &Value) -> Result<SendReceipt, WhatsAppError> {
        let text = self.post(body).await?;
        serde_json::from_str(&text).map_err(|e| WhatsAppError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MessageSender for KapsoClient {
    fn name(&self) -> &str {
        "kapso"
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, WhatsAppError> {
        debug!(to, chars = text.len(), "sending text message");
        self.post_for_receipt(&text_body(to, text)).await
    }

    async fn send_interactive(
        &self,
        to: &str,
        body: &str,
        buttons: &[ReplyButton],
    ) -> Result<SendReceipt, WhatsAppError> {
        debug!(to, buttons = buttons.len(), "sending interactive message");
        self.post_for_receipt(&interactive_body(to, body, buttons))
            .await
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        self.post(&json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
        }))
        .await?;
        Ok(())
    }
}

fn text_body(to: &str, text: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": text },
    })
}

fn interactive_body(to: &str, body: &str, buttons: &[ReplyButton]) -> Value {
    let buttons: Vec<Value> = buttons
        .iter()
        .map(|b| {
            json!({
                "type": "reply",
                "reply": { "id": b.id, "title": b.title },
            })
        })
        .collect();

    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "interactive",
        "interactive": {
            "type": "button",
            "body": { "text": body },
            "action": { "buttons": buttons },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WhatsAppConfig {
        WhatsAppConfig {
            api_key: "k-1".to_string(),
            phone_number_id: "pn-1".to_string(),
            base_url: "https://api.kapso.ai/meta/whatsapp/".to_string(),
            ..WhatsAppConfig::default()
        }
    }

    #[test]
    fn url_includes_version_and_phone_id() {
        let client = KapsoClient::new(&config()).expect("client");
        assert_eq!(
            client.messages_url(),
            "https://api.kapso.ai/meta/whatsapp/v21.0/pn-1/messages"
        );
    }

    #[test]
    fn empty_credentials_fail_fast() {
        let mut cfg = config();
        cfg.api_key = String::new();
        assert!(matches!(
            KapsoClient::new(&cfg),
            Err(WhatsAppError::MissingCredential("whatsapp.api_key"))
        ));

        let mut cfg = config();
        cfg.phone_number_id = "  ".to_string();
        assert!(matches!(
            KapsoClient::new(&cfg),
            Err(WhatsAppError::MissingCredential("whatsapp.phone_number_id"))
        ));
    }

    #[test]
    fn interactive_body_shape() {
        let body = interactive_body(
            "549",
            "¿Qué hacemos?",
            &[ReplyButton::new("sell", "Vender"), ReplyButton::new("hold", "Esperar")],
        );
        assert_eq!(body["interactive"]["type"], "button");
        assert_eq!(body["interactive"]["body"]["text"], "¿Qué hacemos?");
        let buttons = body["interactive"]["action"]["buttons"]
            .as_array()
            .expect("buttons");
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[1]["reply"]["title"], "Esperar");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "ñ".repeat(300);
        let cut = truncate_chars(&long, ERROR_BODY_MAX);
        assert_eq!(cut.chars().count(), 200);
    }
}
