use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Most recent messages replayed into the prompt. Older rows stay persisted.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;
pub const DEFAULT_AGENT_NAME: &str = "Rodo";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_MARKET_FRESHNESS_HOURS: i64 = 24;

/// Top-level config (rodo.toml + RODO_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RodoConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Persona name substituted into the system prompt.
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Number of most recent messages replayed as conversation history.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Optional custom prompt template. Must contain all three placeholders.
    pub prompt_path: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            history_window: DEFAULT_HISTORY_WINDOW,
            prompt_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
        }
    }
}

/// Kapso proxy in front of the WhatsApp Cloud API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub phone_number_id: String,
    #[serde(default = "default_whatsapp_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Shared secret for X-Hub-Signature-256 and the GET verification handshake.
    /// When unset, signature checks are skipped and verification always fails.
    pub webhook_secret: Option<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            phone_number_id: String::new(),
            base_url: default_whatsapp_base_url(),
            api_version: default_api_version(),
            webhook_secret: None,
        }
    }
}

impl WhatsAppConfig {
    /// Configured webhook secret; an empty string counts as unset.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Quotes older than this are ignored and the indicative snapshot is used.
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            freshness_hours: DEFAULT_MARKET_FRESHNESS_HOURS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_whatsapp_base_url() -> String {
    "https://api.kapso.ai/meta/whatsapp".to_string()
}
fn default_api_version() -> String {
    "v21.0".to_string()
}
fn default_freshness_hours() -> i64 {
    DEFAULT_MARKET_FRESHNESS_HOURS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.rodo/rodo.db", home)
}

impl RodoConfig {
    /// Load config from a TOML file with RODO_* env var overrides.
    ///
    /// Nested keys use a double underscore: `RODO_WHATSAPP__API_KEY`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: RodoConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RODO_").split("__"))
            .extract()
            .map_err(|e| crate::error::RodoError::Config(e.to_string()))?;

        config.apply_fallbacks(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fill empty fields from the deployment's well-known env vars
    /// (`GOOGLE_AI_API_KEY`, `KAPSO_*`, `AGENT_NAME`, `DATABASE_PATH`).
    ///
    /// Values already set through TOML or RODO_* always win.
    pub fn apply_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.providers.gemini.api_key.is_empty() {
            if let Some(v) = non_empty("GOOGLE_AI_API_KEY") {
                self.providers.gemini.api_key = v;
            }
        }
        if self.whatsapp.api_key.is_empty() {
            if let Some(v) = non_empty("KAPSO_API_KEY") {
                self.whatsapp.api_key = v;
            }
        }
        if self.whatsapp.phone_number_id.is_empty() {
            if let Some(v) = non_empty("KAPSO_PHONE_NUMBER_ID") {
                self.whatsapp.phone_number_id = v;
            }
        }
        if self.whatsapp.webhook_secret().is_none() {
            self.whatsapp.webhook_secret = non_empty("KAPSO_WEBHOOK_SECRET");
        }
        if self.agent.name == DEFAULT_AGENT_NAME {
            if let Some(v) = non_empty("AGENT_NAME") {
                self.agent.name = v;
            }
        }
        if self.database.path == default_db_path() {
            if let Some(v) = non_empty("DATABASE_PATH") {
                self.database.path = v;
            }
        }
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.rodo/rodo.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        let config = RodoConfig::load(path.to_str()).expect("load");

        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.agent.history_window, 20);
        assert_eq!(config.agent.model, DEFAULT_MODEL);
        assert_eq!(config.market.freshness_hours, 24);
    }

    #[test]
    fn toml_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rodo.toml");
        std::fs::write(
            &path,
            r#"
[gateway]
port = 8080

[agent]
name = "Chacho"
history_window = 10

[whatsapp]
api_key = "k-123"
phone_number_id = "555"
webhook_secret = "s3cret"
"#,
        )
        .expect("write");

        let config = RodoConfig::load(path.to_str()).expect("load");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert_eq!(config.agent.name, "Chacho");
        assert_eq!(config.agent.history_window, 10);
        assert_eq!(config.whatsapp.api_key, "k-123");
        assert_eq!(config.whatsapp.webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.whatsapp.api_version, "v21.0");
    }

    #[test]
    fn fallbacks_fill_only_empty_fields() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_AI_API_KEY", "g-key"),
            ("KAPSO_API_KEY", "ignored"),
            ("KAPSO_PHONE_NUMBER_ID", "123"),
            ("KAPSO_WEBHOOK_SECRET", "hook"),
            ("AGENT_NAME", "Tito"),
        ]
        .into_iter()
        .collect();

        let mut config = RodoConfig::default();
        config.whatsapp.api_key = "from-toml".to_string();
        config.apply_fallbacks(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.providers.gemini.api_key, "g-key");
        assert_eq!(config.whatsapp.api_key, "from-toml");
        assert_eq!(config.whatsapp.phone_number_id, "123");
        assert_eq!(config.whatsapp.webhook_secret.as_deref(), Some("hook"));
        assert_eq!(config.agent.name, "Tito");
    }

    #[test]
    fn empty_webhook_secret_counts_as_unset() {
        let mut wa = WhatsAppConfig::default();
        assert_eq!(wa.webhook_secret(), None);
        wa.webhook_secret = Some(String::new());
        assert_eq!(wa.webhook_secret(), None);
        wa.webhook_secret = Some("hook".to_string());
        assert_eq!(wa.webhook_secret(), Some("hook"));
    }

    #[test]
    fn blank_fallback_values_are_ignored() {
        let mut config = RodoConfig::default();
        config.apply_fallbacks(|k| (k == "KAPSO_WEBHOOK_SECRET").then(|| "  ".to_string()));
        assert!(config.whatsapp.webhook_secret.is_none());
    }
}
