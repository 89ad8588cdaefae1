//! System prompt template for the grain-broker persona.
//!
//! The skeleton carries three placeholders that are filled per turn. The
//! agent name is substituted once, when the template is built.

use std::path::Path;

use tracing::{info, warn};

pub const MARKET_PLACEHOLDER: &str = "{{MARKET_CONTEXT}}";
pub const PRODUCER_PLACEHOLDER: &str = "{{PRODUCER_CONTEXT}}";
pub const HISTORY_PLACEHOLDER: &str = "{{CONVERSATION_HISTORY}}";
const NAME_PLACEHOLDER: &str = "{{AGENT_NAME}}";

pub const NO_MARKET_DATA: &str = "No hay datos de mercado disponibles actualmente.";
pub const NO_PRODUCER_DATA: &str = "Productor nuevo, sin información registrada.";
pub const NO_HISTORY: &str = "Esta es una conversación nueva.";

const DEFAULT_TEMPLATE: &str = "\
Sos un comercial de granos experimentado en Argentina. Tu nombre es {{AGENT_NAME}}.

## Tu rol
Asesorás a productores agropecuarios argentinos sobre:
- Estrategias de venta de soja, maíz, trigo, girasol, cebada y otros granos
- Análisis del mercado local (Rosario, Buenos Aires) e internacional (Chicago, MATBA-ROFEX)
- Timing óptimo de ventas considerando la estacionalidad
- Herramientas de cobertura: futuros, opciones, forwards
- Logística y almacenamiento
- Retenciones, tipos de cambio y cuestiones impositivas relevantes

## Tu personalidad
- Hablás en español rioplatense, de forma directa pero amable
- Usás términos del campo cuando corresponde (campaña, disponible, forward, etc.)
- Sos práctico y vas al grano (literalmente)
- Cuando no tenés datos actualizados, lo decís claramente
- Siempre considerás el contexto del productor (ubicación, tamaño, cultivos)

## Formato de respuestas
- Respuestas concisas, ideales para WhatsApp (máximo 3-4 párrafos)
- Usás bullet points cuando listás opciones
- Incluís números y datos concretos cuando están disponibles
- Si necesitás más info del productor para dar mejor asesoramiento, preguntás

## Contexto actual del mercado
{{MARKET_CONTEXT}}

## Información del productor
{{PRODUCER_CONTEXT}}

## Conversación previa
{{CONVERSATION_HISTORY}}
";

/// A prompt skeleton with the agent name already applied.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    skeleton: String,
}

impl PromptTemplate {
    /// Built-in template for the given persona name.
    pub fn new(agent_name: &str) -> Self {
        Self::from_skeleton(DEFAULT_TEMPLATE, agent_name)
    }

    /// Load a custom template from disk, falling back to the built-in one
    /// when the file is unreadable or misses a placeholder.
    pub fn load(prompt_path: Option<&str>, agent_name: &str) -> Self {
        let Some(path) = prompt_path else {
            return Self::new(agent_name);
        };

        match std::fs::read_to_string(Path::new(path)) {
            Ok(raw) => {
                let missing: Vec<&str> = [MARKET_PLACEHOLDER, PRODUCER_PLACEHOLDER, HISTORY_PLACEHOLDER]
                    .into_iter()
                    .filter(|p| !raw.contains(p))
                    .collect();
                if missing.is_empty() {
                    info!(path, "loaded custom prompt template");
                    Self::from_skeleton(&raw, agent_name)
                } else {
                    warn!(path, ?missing, "prompt template lacks placeholders, using built-in");
                    Self::new(agent_name)
                }
            }
            Err(e) => {
                warn!(path, error = %e, "cannot read prompt template, using built-in");
                Self::new(agent_name)
            }
        }
    }

    fn from_skeleton(skeleton: &str, agent_name: &str) -> Self {
        Self {
            skeleton: skeleton.replace(NAME_PLACEHOLDER, agent_name),
        }
    }

    /// The skeleton with placeholders still in place.
    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    /// Fill the three placeholders. Each empty section gets its own
    /// fallback text; non-empty sections are inserted verbatim.
    pub fn render(&self, market: &str, producer: &str, history: &str) -> String {
        self.skeleton
            .replacen(MARKET_PLACEHOLDER, or_fallback(market, NO_MARKET_DATA), 1)
            .replacen(PRODUCER_PLACEHOLDER, or_fallback(producer, NO_PRODUCER_DATA), 1)
            .replacen(HISTORY_PLACEHOLDER, or_fallback(history, NO_HISTORY), 1)
    }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_name_is_applied_at_construction() {
        let t = PromptTemplate::new("Chacho");
        assert!(t.skeleton().contains("Tu nombre es Chacho."));
        assert!(!t.skeleton().contains(NAME_PLACEHOLDER));
    }

    #[test]
    fn render_fills_all_placeholders() {
        let out = PromptTemplate::new("Rodo").render("SOJA: 295", "Nombre: Juan", "Productor: hola");
        assert!(out.contains("## Contexto actual del mercado\nSOJA: 295"));
        assert!(out.contains("## Información del productor\nNombre: Juan"));
        assert!(out.contains("## Conversación previa\nProductor: hola"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn empty_sections_use_their_own_fallback() {
        let out = PromptTemplate::new("Rodo").render("", "", "");
        assert!(out.contains(NO_MARKET_DATA));
        assert!(out.contains(NO_PRODUCER_DATA));
        assert!(out.contains(NO_HISTORY));
    }

    #[test]
    fn sections_are_not_truncated() {
        let long = "x".repeat(50_000);
        let out = PromptTemplate::new("Rodo").render(&long, "p", "h");
        assert!(out.contains(&long));
    }

    #[test]
    fn render_is_idempotent() {
        let t = PromptTemplate::new("Rodo");
        let a = t.render("m", "p", "h");
        let b = t.render("m", "p", "h");
        assert_eq!(a, b);
        // The template itself is untouched by rendering.
        assert!(t.skeleton().contains(MARKET_PLACEHOLDER));
    }

    #[test]
    fn custom_template_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompt.md");
        std::fs::write(
            &path,
            "Soy {{AGENT_NAME}}.\n{{MARKET_CONTEXT}}|{{PRODUCER_CONTEXT}}|{{CONVERSATION_HISTORY}}",
        )
        .expect("write");

        let t = PromptTemplate::load(path.to_str(), "Tito");
        assert_eq!(t.render("m", "p", "h"), "Soy Tito.\nm|p|h");
    }

    #[test]
    fn incomplete_custom_template_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "Only {{MARKET_CONTEXT}} here").expect("write");

        let t = PromptTemplate::load(path.to_str(), "Rodo");
        assert!(t.skeleton().starts_with("Sos un comercial de granos"));
    }

    #[test]
    fn unreadable_custom_template_falls_back() {
        let t = PromptTemplate::load(Some("/nonexistent/rodo/prompt.md"), "Rodo");
        assert!(t.skeleton().contains(HISTORY_PLACEHOLDER));
    }
}
