//! HTTP request and response types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use askui_core::WidgetType;

/// Request body for creating a UI request.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    /// Widget kind.
    #[serde(rename = "type")]
    pub kind: WidgetType,

    /// Session identifier; accepted for wire compatibility, not isolated.
    #[serde(default, rename = "sessionId")]
    pub session_id: String,

    /// Opaque widget input. Missing or null is rejected by the store.
    #[serde(default)]
    pub input: Value,

    /// Server-side expiry in seconds; `<= 0` falls back to the default.
    #[serde(default)]
    pub timeout: i64,
}

/// Request body for submitting a response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponseBody {
    #[serde(default)]
    pub output: Value,
}

/// Query parameters for the long-poll wait endpoint.
#[derive(Debug, Deserialize)]
pub struct WaitParams {
    /// Poll window in seconds; non-positive values fall back to the default.
    pub timeout: Option<i64>,
}

/// Response body for a successful image upload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    pub id: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build a JSON error response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
