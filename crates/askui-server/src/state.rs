//! Shared application state.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::images::ImageStore;
use crate::store::RequestStore;

/// Shared application state.
pub struct AppState {
    /// Request lifecycle store.
    pub store: RequestStore,

    /// Ephemeral uploaded-image store. `None` when initialization failed;
    /// the image endpoints answer 503 in that case.
    pub images: Option<ImageStore>,

    /// Push-notification fan-out to connected WebSocket clients.
    pub broadcaster: Broadcaster,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(images: Option<ImageStore>) -> Arc<Self> {
        Arc::new(Self {
            store: RequestStore::new(),
            images,
            broadcaster: Broadcaster::new(),
        })
    }
}
