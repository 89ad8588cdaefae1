/// Errors produced by the WhatsApp adapter.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx from the messaging API. `message` is the response body,
    /// truncated to `ERROR_BODY_MAX` characters.
    #[error("Kapso error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Required credentials were empty at construction time.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Upstream error bodies are cut to this many characters.
pub const ERROR_BODY_MAX: usize = 200;

/// Truncate on a char boundary, never mid code point.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
