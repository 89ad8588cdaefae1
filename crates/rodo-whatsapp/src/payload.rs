//! Inbound webhook payload normalisation.
//!
//! Two wire shapes reach the webhook:
//! - **Kapso**: the proxy's own envelope, `{ "message": {...}, "conversation": {...}, ... }`.
//! - **Meta**: the WhatsApp Cloud API envelope, `{ "object": ..., "entry": [{ "changes": [...] }] }`.
//!
//! The shape is detected from its top-level discriminator key before any
//! structural access, then each variant is deserialised into its own typed
//! struct. Both reduce to one [`InboundMessage`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reply text used when the user sends something other than text or an
/// interactive selection (image, audio, sticker, ...).
pub const UNSUPPORTED_MESSAGE_TEXT: &str = "[Mensaje no soportado - por favor enviá texto]";

/// Canonical inbound message, independent of wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender phone id.
    pub from: String,
    pub text: String,
    /// Platform message id, used for read receipts.
    pub message_id: String,
}

/// A webhook body, classified by shape.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    Kapso(KapsoPayload),
    Meta(MetaPayload),
    /// Valid JSON carrying neither discriminator.
    Unrecognized,
}

impl WebhookPayload {
    /// Parse raw body bytes. Errors only on malformed JSON or a
    /// discriminator field of the wrong type.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Classify an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match detect_shape(&value) {
            Shape::Kapso => Ok(WebhookPayload::Kapso(serde_json::from_value(value)?)),
            Shape::Meta => Ok(WebhookPayload::Meta(serde_json::from_value(value)?)),
            Shape::Unknown => Ok(WebhookPayload::Unrecognized),
        }
    }

    /// Short label for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            WebhookPayload::Kapso(_) => "kapso",
            WebhookPayload::Meta(_) => "meta",
            WebhookPayload::Unrecognized => "unrecognized",
        }
    }

    /// Extract the user message, or `None` for anything that is not one
    /// (status callbacks, outbound echoes, empty envelopes).
    pub fn extract(&self) -> Option<InboundMessage> {
        match self {
            WebhookPayload::Kapso(p) => extract_kapso(p),
            WebhookPayload::Meta(p) => extract_meta(p),
            WebhookPayload::Unrecognized => None,
        }
    }
}

enum Shape {
    Kapso,
    Meta,
    Unknown,
}

fn detect_shape(value: &Value) -> Shape {
    let Some(obj) = value.as_object() else {
        return Shape::Unknown;
    };
    // A null `message` means "no message", not "Kapso shape".
    if obj.get("message").is_some_and(|m| !m.is_null()) {
        Shape::Kapso
    } else if obj.contains_key("entry") {
        Shape::Meta
    } else {
        Shape::Unknown
    }
}

// ── Shared message pieces ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Interactive {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub button_reply: Option<ReplyOption>,
    pub list_reply: Option<ReplyOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyOption {
    pub id: Option<String>,
    pub title: Option<String>,
}

/// Fields common to both shapes' message objects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    pub timestamp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub text: Option<TextBody>,
    pub interactive: Option<Interactive>,
}

impl WireMessage {
    /// Literal text for `text` messages.
    fn text_body(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.text.as_ref().map(|t| t.body.as_str())
    }

    /// Selected option for `interactive` messages: title, else id.
    /// Button replies take precedence over list replies.
    fn interactive_selection(&self) -> Option<&str> {
        if self.kind != "interactive" {
            return None;
        }
        let interactive = self.interactive.as_ref()?;
        let reply = interactive
            .button_reply
            .as_ref()
            .or(interactive.list_reply.as_ref())?;
        non_empty(reply.title.as_deref()).or_else(|| non_empty(reply.id.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

// ── Kapso shape ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct KapsoPayload {
    pub message: KapsoMessage,
    pub conversation: Option<KapsoConversation>,
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub is_new_conversation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KapsoMessage {
    #[serde(flatten)]
    pub wire: WireMessage,
    pub kapso: Option<KapsoMeta>,
}

/// Proxy-side metadata. `content` carries a text rendering of non-text
/// messages (transcriptions, captions) when Kapso has one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KapsoMeta {
    pub direction: Option<String>,
    pub status: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KapsoConversation {
    pub id: Option<String>,
    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

fn extract_kapso(payload: &KapsoPayload) -> Option<InboundMessage> {
    let msg = &payload.message;

    // Kapso also reports our own sends (and their delivery status) through
    // the same envelope; those are not user messages.
    if msg
        .kapso
        .as_ref()
        .and_then(|k| k.direction.as_deref())
        .is_some_and(|d| d.eq_ignore_ascii_case("outbound"))
    {
        return None;
    }
    if msg.wire.from.is_empty() {
        return None;
    }

    let text = msg
        .wire
        .text_body()
        .or_else(|| msg.wire.interactive_selection())
        .or_else(|| non_empty(msg.kapso.as_ref().and_then(|k| k.content.as_deref())))
        .unwrap_or(UNSUPPORTED_MESSAGE_TEXT);

    Some(InboundMessage {
        from: msg.wire.from.clone(),
        text: text.to_string(),
        message_id: msg.wire.id.clone(),
    })
}

// ── Meta shape ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct MetaPayload {
    pub object: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entry: Vec<MetaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaEntry {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub changes: Vec<MetaChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaChange {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: MetaValue,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaValue {
    pub messaging_product: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<MetaContact>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<WireMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub statuses: Vec<MetaStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaContact {
    pub wa_id: Option<String>,
}

/// Delivery/read receipt for a message we sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaStatus {
    pub id: Option<String>,
    pub status: Option<String>,
    pub recipient_id: Option<String>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn extract_meta(payload: &MetaPayload) -> Option<InboundMessage> {
    // Only the first entry / change / message is considered. Status-only
    // changes have an empty `messages` array and fall out here.
    let message = payload
        .entry
        .first()?
        .changes
        .first()?
        .value
        .messages
        .first()?;

    if message.from.is_empty() {
        return None;
    }

    let text = message
        .text_body()
        .or_else(|| message.interactive_selection())
        .unwrap_or(UNSUPPORTED_MESSAGE_TEXT);

    Some(InboundMessage {
        from: message.from.clone(),
        text: text.to_string(),
        message_id: message.id.clone(),
    })
}
