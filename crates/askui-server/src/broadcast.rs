//! Push-notification fan-out to connected UI subscribers.
//!
//! Delivery is best-effort and at-most-once per subscriber: there is no
//! buffering beyond each subscriber's bounded channel and no redelivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use askui_core::UiRequest;

/// Headroom beyond the replayed pending set in each subscriber channel.
const EVENT_BUFFER: usize = 32;

/// A request lifecycle event, fanned out to all subscribers.
///
/// Serializes to the frontend wire shape:
/// `{"type": "new_request" | "request_completed", "request": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "request")]
pub enum UiEvent {
    #[serde(rename = "new_request")]
    Created(UiRequest),
    #[serde(rename = "request_completed")]
    Completed(UiRequest),
}

impl UiEvent {
    pub fn request(&self) -> &UiRequest {
        match self {
            UiEvent::Created(req) | UiEvent::Completed(req) => req,
        }
    }
}

/// A live subscription handed to one connection task.
///
/// Dropping it (or the whole connection task) closes the channel; the next
/// broadcast prunes the registry entry.
pub struct Subscription {
    pub id: u64,
    pub events: mpsc::Receiver<UiEvent>,
}

/// Registry of connected push subscribers.
pub struct Broadcaster {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<UiEvent>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber and replay the currently pending requests
    /// as `Created` events so a late joiner resynchronizes. Replay order is
    /// not guaranteed.
    pub async fn subscribe(&self, pending: Vec<UiRequest>) -> Subscription {
        // Size the channel so the replay always fits.
        let (tx, rx) = mpsc::channel(pending.len() + EVENT_BUFFER);
        for req in pending {
            let _ = tx.try_send(UiEvent::Created(req));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().await.insert(id, tx);
        Subscription { id, events: rx }
    }

    /// Remove a subscriber, e.g. on disconnect.
    pub async fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().await.remove(&id);
    }

    /// Fan an event out to every subscriber.
    ///
    /// The subscriber set is snapshotted under the lock and the lock released
    /// before sending, so one slow subscriber cannot stall registration or
    /// removal of others. A full or closed channel drops that subscriber.
    pub async fn broadcast(&self, event: UiEvent) {
        let targets: Vec<(u64, mpsc::Sender<UiEvent>)> = {
            let subscribers = self.subscribers.lock().await;
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        for (id, tx) in targets {
            if tx.try_send(event.clone()).is_err() {
                warn!(subscriber = id, "subscriber gone or not keeping up, dropping");
                self.subscribers.lock().await.remove(&id);
            }
        }
    }

    /// Drop every subscriber channel so connection tasks observe closure
    /// and exit. Used at shutdown.
    pub async fn close_all(&self) {
        self.subscribers.lock().await.clear();
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
