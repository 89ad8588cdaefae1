//! WhatsApp channel plumbing: webhook signature checks, inbound payload
//! normalisation and the outbound Kapso client.

pub mod client;
pub mod error;
pub mod payload;
pub mod sender;
pub mod signature;

pub use client::KapsoClient;
pub use error::WhatsAppError;
pub use payload::{InboundMessage, WebhookPayload, UNSUPPORTED_MESSAGE_TEXT};
pub use sender::{MessageSender, ReplyButton, SendReceipt};
