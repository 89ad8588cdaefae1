use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RodoError;

/// Primary key for producers, conversations and inventory rows.
///
/// UUIDv7 so ids sort by creation time in logs and indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Author of a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "USER",
            MessageRole::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = RodoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "USER" => Ok(MessageRole::User),
            "ASSISTANT" => Ok(MessageRole::Assistant),
            other => Err(RodoError::InvalidValue {
                field: "message role",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a conversation. Only `Active` accepts new messages;
/// closing and archiving happen outside the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    #[default]
    Active,
    Closed,
    Archived,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "ACTIVE",
            ConversationStatus::Closed => "CLOSED",
            ConversationStatus::Archived => "ARCHIVED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ConversationStatus::Active)
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = RodoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ConversationStatus::Active),
            "CLOSED" => Ok(ConversationStatus::Closed),
            "ARCHIVED" => Ok(ConversationStatus::Archived),
            other => Err(RodoError::InvalidValue {
                field: "conversation status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_parses_stored_form() {
        assert_eq!(MessageRole::from_str("USER").unwrap(), MessageRole::User);
        assert_eq!(
            MessageRole::from_str("ASSISTANT").unwrap(),
            MessageRole::Assistant
        );
        assert!(MessageRole::from_str("user").is_err());
    }

    #[test]
    fn unknown_status_names_the_field() {
        let err = ConversationStatus::from_str("PAUSED").unwrap_err();
        assert!(matches!(
            err,
            RodoError::InvalidValue { field: "conversation status", .. }
        ));
        assert_eq!(err.to_string(), "Invalid value for conversation status: PAUSED");
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&ConversationStatus::Active).unwrap();
        assert_eq!(json, r#""ACTIVE""#);
        assert!(ConversationStatus::from_str("CLOSED").unwrap() != ConversationStatus::Active);
    }

    #[test]
    fn record_ids_are_v7() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        let parsed = Uuid::parse_str(a.as_str()).expect("uuid");
        assert_eq!(parsed.get_version_num(), 7);
    }
}
