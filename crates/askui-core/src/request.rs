//! UiRequest - the unit of coordination between a producer and the web UI.

use crate::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a UiRequest.
///
/// The store only ever performs the `Pending` -> `Completed` transition.
/// `Timeout` and `Error` exist for collaborators marking their own local
/// give-up; the store never produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for a human response.
    Pending,
    /// A response has been recorded; terminal.
    Completed,
    /// Caller-side expiry marker (informational).
    Timeout,
    /// Caller-side failure marker (informational).
    Error,
}

/// Kind of widget the web UI should render for a request.
///
/// Opaque to the coordination machinery; the payload shapes live in
/// [`crate::widget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Confirm,
    Select,
    Form,
    Upload,
    Table,
    Image,
}

/// The canonical request object exchanged between CLI, server, and frontend.
///
/// `input` and `output` stay opaque JSON here; the CLI decodes them into the
/// typed widget structs where needed. Field names follow the frontend wire
/// format (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiRequest {
    /// Unique request identifier, assigned at creation.
    pub id: RequestId,

    /// Widget kind to render.
    #[serde(rename = "type")]
    pub kind: WidgetType,

    /// Session identifier. Sessions are not isolated; this stays "global"
    /// but is kept on the wire for frontend compatibility.
    pub session_id: String,

    /// Opaque input payload supplied by the producer.
    pub input: Value,

    /// Opaque output payload; present only after completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// Current lifecycle status.
    pub status: RequestStatus,

    /// When the request was created.
    pub created_at: DateTime<Utc>,

    /// When the request was completed, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Informational deadline; not enforced by the store.
    pub expires_at: DateTime<Utc>,

    /// Caller-side error description, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UiRequest {
    /// Check if the request is in a terminal state.
    pub fn is_completed(&self) -> bool {
        self.status == RequestStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> UiRequest {
        UiRequest {
            id: RequestId::new("req-1"),
            kind: WidgetType::Confirm,
            session_id: "global".to_string(),
            input: json!({"title": "Deploy?"}),
            output: None,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            expires_at: Utc::now(),
            error: None,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "confirm");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["sessionId"], "global");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("expiresAt").is_some());
        // Absent optionals are omitted entirely.
        assert!(value.get("output").is_none());
        assert!(value.get("completedAt").is_none());
    }

    #[test]
    fn test_roundtrip() {
        let req = sample();
        let decoded: UiRequest =
            serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(
            serde_json::to_value(RequestStatus::Completed).unwrap(),
            "completed"
        );
        assert_eq!(
            serde_json::from_value::<RequestStatus>(json!("timeout")).unwrap(),
            RequestStatus::Timeout
        );
    }
}
