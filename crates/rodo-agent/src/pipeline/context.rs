//! Builders for the producer and history sections of the prompt.

use rodo_core::types::MessageRole;
use rodo_store::{Message, Producer};

/// Emitted instead of an empty profile.
pub const EMPTY_PROFILE: &str = "Productor nuevo, sin información registrada.";
/// Emitted when the conversation has no prior messages.
pub const EMPTY_HISTORY: &str = "Conversación nueva";

/// Labeled profile lines in fixed order, then the inventory list.
pub fn producer_context(producer: &Producer) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = non_empty(&producer.name) {
        parts.push(format!("Nombre: {name}"));
    }
    if let Some(company) = non_empty(&producer.company) {
        parts.push(format!("Empresa: {company}"));
    }
    if let Some(location) = non_empty(&producer.location) {
        parts.push(format!("Ubicación: {location}"));
    }
    if let Some(hectares) = producer.hectares.filter(|h| *h != 0.0) {
        parts.push(format!("Hectáreas: {hectares}"));
    }
    if !producer.main_crops.is_empty() {
        parts.push(format!(
            "Cultivos principales: {}",
            producer.main_crops.join(", ")
        ));
    }

    if !producer.inventory.is_empty() {
        parts.push("\nInventario actual:".to_string());
        for item in &producer.inventory {
            let mut line = format!("- {}: {} tn", item.crop, item.quantity);
            if let Some(quality) = non_empty(&item.quality) {
                line.push_str(&format!(" ({quality})"));
            }
            if let Some(harvest) = non_empty(&item.harvest) {
                line.push_str(&format!(" - Campaña {harvest}"));
            }
            parts.push(line);
        }
    }

    if parts.is_empty() {
        EMPTY_PROFILE.to_string()
    } else {
        parts.join("\n")
    }
}

/// Render the recent window chronologically.
///
/// `recent` comes from the store newest first and is reversed here.
pub fn conversation_history(recent: &[Message]) -> String {
    if recent.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    recent
        .iter()
        .rev()
        .map(|m| {
            let label = match m.role {
                MessageRole::User => "Productor",
                MessageRole::Assistant => "Asistente",
            };
            format!("{label}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
