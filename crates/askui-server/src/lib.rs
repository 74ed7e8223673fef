//! askui backend server.
//!
//! Owns the in-memory request lifecycle store, the ephemeral image store
//! with its expiry sweeper, the WebSocket event fan-out, and the HTTP API
//! that ties them together.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod broadcast;
pub mod config;
pub mod http;
pub mod images;
pub mod state;
pub mod store;

pub use broadcast::{Broadcaster, UiEvent};
pub use config::Config;
pub use images::{BlobError, ImageStore, ImageStoreOptions, StoredImage};
pub use state::AppState;
pub use store::{CreateParams, RequestStore};

/// Bind and serve until ctrl-c.
///
/// Spawns the periodic image expiry sweeper alongside the HTTP server and
/// drains all push subscribers on the way out.
pub async fn run(config: Config) -> std::io::Result<()> {
    let images = match ImageStore::new(ImageStoreOptions {
        dir: config.image_dir.clone(),
        max_upload_bytes: Some(config.max_upload_bytes),
    }) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "failed to initialize image store, uploads disabled");
            None
        }
    };

    let state = AppState::new(images);
    let router = http::create_router(state.clone(), config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "askui server listening");

    let sweeper = tokio::spawn(sweep_expired_images(
        state.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    state.broadcaster.close_all().await;
    info!("askui server stopped");
    Ok(())
}

/// Periodically delete expired image blobs, decoupled from request traffic.
async fn sweep_expired_images(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Some(images) = &state.images {
            let deleted = images.cleanup(Utc::now()).await;
            if deleted > 0 {
                info!(deleted, "cleaned up expired images");
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler");
    }
}
