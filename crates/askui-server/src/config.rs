//! Server configuration.

use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Directory for uploaded image blobs. Defaults to a temp-dir subfolder.
    pub image_dir: Option<PathBuf>,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: i64,

    /// How often the image expiry sweeper runs (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            image_dir: None,
            max_upload_bytes: 50 << 20,
            sweep_interval_secs: 30,
        }
    }
}
