//! Google AI Studio (Gemini API) provider.
//!
//! Authenticates with a plain API key in the `x-goog-api-key` header and
//! calls the `generateContent` endpoint. Usage metadata is optional in the
//! response; missing counts are reported as 0.

use async_trait::async_trait;
use rodo_core::config::GeminiConfig;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, Role};

/// Backoff hint used when a 429 carries no usable Retry-After header.
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "providers.gemini.api_key is not configured".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(&self, req: &ChatRequest) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = req
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    Role::User => "user",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": req.max_tokens,
            }
        });

        if !req.system.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": req.system }]
            });
        }

        body
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = self.endpoint(&req.model);
        let body = self.build_body(req);

        debug!(model = %req.model, turns = req.messages.len(), "sending request to Gemini");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_ms = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(ProviderError::RateLimited { retry_after_ms });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(reason) = api_resp
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!(reason, "Gemini blocked the prompt");
            return Err(ProviderError::EmptyResponse(format!("prompt blocked: {reason}")));
        }

        let candidate = api_resp.candidates.into_iter().next();
        let content = candidate
            .as_ref()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let stop_reason = candidate.and_then(|c| c.finish_reason).unwrap_or_default();

        if content.is_empty() {
            warn!(stop_reason = %stop_reason, "Gemini returned no candidate text");
            let detail = if stop_reason.is_empty() {
                "no candidates".to_string()
            } else {
                format!("finish reason {stop_reason}")
            };
            return Err(ProviderError::EmptyResponse(detail));
        }
        let usage = api_resp.usage_metadata.unwrap_or_default();

        Ok(ChatResponse {
            content,
            model: api_resp.model_version.unwrap_or_else(|| req.model.clone()),
            tokens_in: usage.prompt_token_count,
            tokens_out: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
            stop_reason,
        })
    }
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(&GeminiConfig {
            api_key: "g-key".into(),
            base_url: "https://generativelanguage.googleapis.com/".into(),
        })
        .expect("provider")
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = GeminiProvider::new(&GeminiConfig::default());
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn endpoint_uses_model_and_trims_slash() {
        assert_eq!(
            provider().endpoint("gemini-2.0-flash-exp"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn body_maps_roles_and_system_instruction() {
        let req = ChatRequest {
            model: "m".into(),
            system: "Sos un comercial de granos.".into(),
            messages: vec![
                Message::user("hola"),
                Message {
                    role: Role::Assistant,
                    content: "¿Qué tal?".into(),
                },
            ],
            max_tokens: 256,
        };
        let body = provider().build_body(&req);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Sos un comercial de granos."
        );
    }

    #[test]
    fn empty_system_is_omitted() {
        let req = ChatRequest {
            model: "m".into(),
            system: String::new(),
            messages: vec![Message::user("hola")],
            max_tokens: 16,
        };
        assert!(provider().build_body(&req).get("systemInstruction").is_none());
    }
}
