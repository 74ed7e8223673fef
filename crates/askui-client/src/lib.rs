//! HTTP client for the askui server.
//!
//! The interesting part is [`Client::wait_request`]: it turns the server's
//! bounded long-poll endpoint into an effectively unbounded wait by retrying
//! on the "poll expired" signal, so per-connection resource use stays
//! bounded while delivery remains near-real-time.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use askui_core::{UiRequest, WidgetType};

mod error;
pub use error::ClientError;

/// Default server-side poll window per wait call.
const DEFAULT_POLL_WINDOW: Duration = Duration::from_secs(25);

/// Minimum poll window, so a nearly spent budget still yields a real poll.
const MIN_POLL_WINDOW: Duration = Duration::from_secs(1);

/// Extra transport time per call beyond the server's poll window, so the
/// HTTP timeout never races the server's own 408.
const POLL_HEADROOM: Duration = Duration::from_secs(5);

/// How much of an error body to keep when reporting a failure.
const MAX_ERROR_BODY_BYTES: usize = 16 << 10;

/// Parameters for [`Client::create_request`].
#[derive(Debug, Clone, Serialize)]
pub struct CreateRequestParams {
    #[serde(rename = "type")]
    pub kind: WidgetType,

    pub input: Value,

    /// Server-side expiry in seconds; 0 lets the server default apply.
    #[serde(rename = "timeout", skip_serializing_if = "is_zero")]
    pub timeout_secs: i64,

    /// Kept for wire compatibility; the server ignores sessions.
    #[serde(rename = "sessionId", skip_serializing_if = "String::is_empty")]
    pub session_id: String,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Response body for a successful image upload.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub id: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
}

/// Client for the askui HTTP API.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a new client.
    ///
    /// No global request timeout is set; long polls carry their own
    /// per-call timeout instead.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a new UI request.
    pub async fn create_request(
        &self,
        params: CreateRequestParams,
    ) -> Result<UiRequest, ClientError> {
        let url = format!("{}/api/requests", self.base_url);
        debug!(url = %url, kind = ?params.kind, "creating request");

        let response = self.http.post(&url).json(&params).send().await?;
        Self::decode_request(response).await
    }

    /// Fetch a request snapshot by id.
    pub async fn get_request(&self, id: &str) -> Result<UiRequest, ClientError> {
        let url = format!("{}/api/requests/{}", self.base_url, id);
        let response = self.http.get(&url).send().await?;
        Self::decode_request(response).await
    }

    /// Block until the request completes or the overall budget runs out.
    ///
    /// `overall_timeout_secs == 0` means wait without a budget; the caller
    /// bounds the call by dropping the future (e.g. via
    /// `tokio::time::timeout`). Each underlying poll asks the server for a
    /// window of at most 25s (clamped to the remaining budget, floor 1s)
    /// and is given 5s of transport headroom on top. The 408 "poll expired"
    /// answer retries immediately; every other failure returns unchanged.
    pub async fn wait_request(
        &self,
        id: &str,
        overall_timeout_secs: u64,
    ) -> Result<UiRequest, ClientError> {
        let deadline = if overall_timeout_secs > 0 {
            Some(Instant::now() + Duration::from_secs(overall_timeout_secs))
        } else {
            None
        };
        let url = format!("{}/api/requests/{}/wait", self.base_url, id);

        loop {
            let mut window = DEFAULT_POLL_WINDOW;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(ClientError::WaitBudgetExceeded);
                }
                window = window.min(remaining).max(MIN_POLL_WINDOW);
            }

            debug!(url = %url, window_secs = window.as_secs(), "polling");
            let response = self
                .http
                .get(&url)
                .query(&[("timeout", window.as_secs())])
                .timeout(window + POLL_HEADROOM)
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
                // Poll expired, request still pending. Go around.
                continue;
            }
            return Self::decode_request(response).await;
        }
    }

    /// Upload a local image file; returns its id and serving URL.
    pub async fn upload_image(
        &self,
        path: &Path,
        ttl_secs: i64,
    ) -> Result<UploadedImage, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(ClientError::UploadRead)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = reqwest::multipart::Form::new()
            .text("ttlSeconds", ttl_secs.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/api/images", self.base_url);
        debug!(url = %url, path = %path.display(), "uploading image");
        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn decode_request(response: reqwest::Response) -> Result<UiRequest, ClientError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(MAX_ERROR_BODY_BYTES);
        ClientError::Api { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn completed_request_json(id: &str) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "type": "confirm",
                "sessionId": "global",
                "input": {{"title": "t"}},
                "output": {{"approved": true}},
                "status": "completed",
                "createdAt": "2025-01-01T00:00:00Z",
                "completedAt": "2025-01-01T00:00:01Z",
                "expiresAt": "2025-01-01T00:05:00Z"
            }}"#
        )
    }

    /// Serve `router` on an ephemeral loopback port.
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_wait_retries_on_poll_expiry() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/api/requests/req-1/wait",
                get(|State(calls): State<Arc<AtomicU32>>| async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n <= 2 {
                        (StatusCode::REQUEST_TIMEOUT, "timeout waiting for response".to_string())
                    } else {
                        (StatusCode::OK, completed_request_json("req-1"))
                    }
                }),
            )
            .with_state(calls.clone());
        let base_url = spawn(router).await;

        let client = Client::new(&base_url);
        let got = client.wait_request("req-1", 2).await.unwrap();

        assert_eq!(got.id.as_str(), "req-1");
        assert!(got.is_completed());
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_unbounded_wait_is_cancellable() {
        // Server never completes: always the retry signal.
        let router = Router::new().route(
            "/api/requests/req-1/wait",
            get(|| async { (StatusCode::REQUEST_TIMEOUT, "timeout waiting for response") }),
        );
        let base_url = spawn(router).await;

        let client = Client::new(&base_url);
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            client.wait_request("req-1", 0),
        )
        .await;
        assert!(result.is_err(), "cancellation must interrupt the wait loop");
    }

    #[tokio::test]
    async fn test_bounded_wait_exhausts_budget() {
        let router = Router::new().route(
            "/api/requests/req-1/wait",
            get(|| async { (StatusCode::REQUEST_TIMEOUT, "timeout waiting for response") }),
        );
        let base_url = spawn(router).await;

        let client = Client::new(&base_url);
        let err = client.wait_request("req-1", 1).await.unwrap_err();
        assert!(matches!(err, ClientError::WaitBudgetExceeded), "{err:?}");
    }

    #[tokio::test]
    async fn test_wait_does_not_retry_other_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/api/requests/req-1/wait",
                get(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, r#"{"error":"request not found"}"#)
                }),
            )
            .with_state(calls.clone());
        let base_url = spawn(router).await;

        let client = Client::new(&base_url);
        let err = client.wait_request("req-1", 5).await.unwrap_err();
        match err {
            ClientError::Api { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND)
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_request_maps_api_errors() {
        let router = Router::new().route(
            "/api/requests",
            axum::routing::post(|| async {
                (StatusCode::BAD_REQUEST, r#"{"error":"input is required"}"#)
            }),
        );
        let base_url = spawn(router).await;

        let client = Client::new(&base_url);
        let err = client
            .create_request(CreateRequestParams {
                kind: WidgetType::Confirm,
                input: Value::Null,
                timeout_secs: 0,
                session_id: String::new(),
            })
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert!(body.contains("input is required"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
