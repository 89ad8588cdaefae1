pub mod health;
pub mod turn;
pub mod webhook;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Error response shape shared by all handlers.
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}
