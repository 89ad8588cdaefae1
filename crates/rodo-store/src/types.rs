use rodo_core::types::{ConversationStatus, MessageRole};
use serde::{Deserialize, Serialize};

/// An agricultural producer, keyed by the WhatsApp phone id.
///
/// Created bare on first contact; profile fields are filled in by
/// profile-management flows outside the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub id: String,
    /// Stable external identifier (the sender's phone number).
    pub phone: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub hectares: Option<f64>,
    pub main_crops: Vec<String>,
    /// Inventory rows in creation order.
    pub inventory: Vec<InventoryItem>,
    pub created_at: String,
    pub updated_at: String,
}

impl Producer {
    /// True when the producer has no profile data and no inventory.
    pub fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.hectares.is_none()
            && self.main_crops.is_empty()
            && self.inventory.is_empty()
    }
}

/// Stock a producer holds, in tonnes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub crop: String,
    pub quantity: f64,
    pub quality: Option<String>,
    /// Harvest season label, e.g. "24/25".
    pub harvest: Option<String>,
}

/// A conversation session owned by exactly one producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub producer_id: String,
    pub status: ConversationStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic insertion id; defines chronological order.
    pub id: i64,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: String,
}

/// A single price observation for a crop on a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub crop: String,
    /// e.g. "Rosario", "MATBA", "Chicago".
    pub market: String,
    /// e.g. "spot", "futuro".
    pub kind: String,
    /// Contract position such as "May25". Absent for spot prices.
    pub position: Option<String>,
    pub price: f64,
    pub currency: String,
    /// RFC3339 observation time.
    pub date: String,
}

/// Result of resolving a phone id to a producer.
#[derive(Debug)]
pub enum ResolvedProducer {
    Known(Producer),
    /// Auto-created on first contact.
    NewlyCreated(Producer),
}

impl ResolvedProducer {
    pub fn producer(&self) -> &Producer {
        match self {
            ResolvedProducer::Known(p) | ResolvedProducer::NewlyCreated(p) => p,
        }
    }

    pub fn into_producer(self) -> Producer {
        match self {
            ResolvedProducer::Known(p) | ResolvedProducer::NewlyCreated(p) => p,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ResolvedProducer::NewlyCreated(_))
    }
}
