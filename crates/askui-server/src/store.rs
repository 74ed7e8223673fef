//! In-memory request lifecycle store with a blocking wait primitive.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{watch, RwLock};

use askui_core::{RequestId, RequestStatus, StoreError, UiRequest, WidgetType};

const DEFAULT_TIMEOUT_SECS: i64 = 300;

/// A stored request plus its completion gate.
///
/// The watch channel is the gate: fired at most once (false -> true) under
/// the same write lock that performs the Pending -> Completed transition.
/// `Receiver::wait_for` inspects the current value before parking, so a
/// waiter that subscribes after completion still returns immediately.
struct RequestEntry {
    req: UiRequest,
    done: watch::Sender<bool>,
}

/// In-memory store for UiRequests.
///
/// Requests live for the process lifetime; `expires_at` is informational
/// and never enforced by the store itself. Waiting holds no store-wide
/// lock, only a receiver on the per-request gate.
pub struct RequestStore {
    requests: RwLock<HashMap<RequestId, RequestEntry>>,
}

/// Parameters for [`RequestStore::create`].
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub kind: WidgetType,
    pub session_id: String,
    pub input: Value,
    pub timeout_secs: i64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new pending request and its completion gate.
    ///
    /// `timeout_secs <= 0` defaults to 300, and a timeout whose expiry is
    /// not representable is rejected as invalid. An empty session id becomes
    /// "global" (sessions are not isolated, the field is wire-compat only).
    pub async fn create(&self, p: CreateParams) -> Result<UiRequest, StoreError> {
        if p.input.is_null() {
            return Err(StoreError::Validation("input is required".to_string()));
        }
        let timeout_secs = if p.timeout_secs <= 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            p.timeout_secs
        };
        let session_id = if p.session_id.is_empty() {
            "global".to_string()
        } else {
            p.session_id
        };

        let now = Utc::now();
        // `seconds` and the `+` addition both panic near the representable
        // edge, and the value comes straight off the wire.
        let expires_at = chrono::Duration::try_seconds(timeout_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| StoreError::Validation("timeout out of range".to_string()))?;
        let req = UiRequest {
            id: RequestId::generate(),
            kind: p.kind,
            session_id,
            input: p.input,
            output: None,
            status: RequestStatus::Pending,
            created_at: now,
            completed_at: None,
            expires_at,
            error: None,
        };

        let (done, _) = watch::channel(false);
        let mut requests = self.requests.write().await;
        requests.insert(
            req.id.clone(),
            RequestEntry {
                req: req.clone(),
                done,
            },
        );

        Ok(req)
    }

    /// Get a snapshot of a request.
    pub async fn get(&self, id: &RequestId) -> Result<UiRequest, StoreError> {
        let requests = self.requests.read().await;
        requests
            .get(id)
            .map(|e| e.req.clone())
            .ok_or(StoreError::NotFound)
    }

    /// Snapshot of all currently pending requests. Order is not significant;
    /// used to resynchronize late-joining subscribers.
    pub async fn pending(&self) -> Vec<UiRequest> {
        let requests = self.requests.read().await;
        requests
            .values()
            .filter(|e| e.req.status == RequestStatus::Pending)
            .map(|e| e.req.clone())
            .collect()
    }

    /// Record the response for a pending request and fire its gate.
    ///
    /// The first completion wins: a second attempt returns
    /// `AlreadyCompleted` without touching the stored output.
    pub async fn complete(&self, id: &RequestId, output: Value) -> Result<UiRequest, StoreError> {
        let mut requests = self.requests.write().await;
        let entry = requests.get_mut(id).ok_or(StoreError::NotFound)?;
        if entry.req.status != RequestStatus::Pending {
            return Err(StoreError::AlreadyCompleted);
        }

        entry.req.output = Some(output);
        entry.req.status = RequestStatus::Completed;
        entry.req.completed_at = Some(Utc::now());

        entry.done.send_replace(true);

        Ok(entry.req.clone())
    }

    /// Block until the request completes, then return the latest snapshot.
    ///
    /// Fails `NotFound` if the id never existed; returns immediately if the
    /// request is already completed. Subscribing to the gate happens under
    /// the same lock that serializes `complete`, so a waiter that begins
    /// before or during the matching completion never misses the wakeup.
    /// The lock is released while parked.
    pub async fn wait(&self, id: &RequestId) -> Result<UiRequest, StoreError> {
        let mut done = {
            let requests = self.requests.read().await;
            let entry = requests.get(id).ok_or(StoreError::NotFound)?;
            if entry.req.status == RequestStatus::Completed {
                return Ok(entry.req.clone());
            }
            entry.done.subscribe()
        };

        // The sender lives in the map for the process lifetime; a closed
        // channel can only mean the entry was removed.
        done.wait_for(|fired| *fired)
            .await
            .map_err(|_| StoreError::NotFound)?;

        self.get(id).await
    }

    /// [`wait`](Self::wait) bounded by a deadline, mapping elapse to
    /// `WaitTimeout` ("still pending", not failure).
    pub async fn wait_with_timeout(
        &self,
        id: &RequestId,
        timeout: Duration,
    ) -> Result<UiRequest, StoreError> {
        match tokio::time::timeout(timeout, self.wait(id)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::WaitTimeout),
        }
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}
