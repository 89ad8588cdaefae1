pub mod db;
pub mod error;
mod market;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use store::ConversationStore;
pub use types::{
    Conversation, InventoryItem, MarketQuote, Message, Producer, ResolvedProducer,
};
