//! Ephemeral blob store for uploaded images.
//!
//! Bytes live on disk under a single directory; metadata lives in an
//! in-memory index. Entries disappear on explicit delete or once the
//! periodic sweep passes their expiry.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use askui_core::ImageId;

/// Image store failures.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Failed to persist or read backing bytes.
    #[error("image store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored blob: file on disk plus just enough metadata to serve it back.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: ImageId,
    pub path: PathBuf,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Options for [`ImageStore::new`].
#[derive(Debug, Default)]
pub struct ImageStoreOptions {
    pub dir: Option<PathBuf>,
    pub max_upload_bytes: Option<i64>,
}

pub struct ImageStore {
    dir: PathBuf,
    max_upload_bytes: i64,
    images: RwLock<HashMap<ImageId, StoredImage>>,
}

impl ImageStore {
    /// Create the store, ensuring the backing directory exists.
    pub fn new(opts: ImageStoreOptions) -> Result<Self, BlobError> {
        let dir = opts
            .dir
            .unwrap_or_else(|| std::env::temp_dir().join("askui-images"));
        let max_upload_bytes = match opts.max_upload_bytes {
            Some(n) if n > 0 => n,
            _ => 50 << 20,
        };

        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_upload_bytes,
            images: RwLock::new(HashMap::new()),
        })
    }

    pub fn max_upload_bytes(&self) -> i64 {
        self.max_upload_bytes
    }

    /// Persist bytes under a fresh id. The caller enforces payload-size and
    /// content-type policy before calling.
    pub async fn put(
        &self,
        bytes: &[u8],
        mime_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<StoredImage, BlobError> {
        let id = ImageId::generate();
        let path = self.dir.join(id.as_str());

        if let Err(e) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        let img = StoredImage {
            id: id.clone(),
            path,
            mime_type: mime_type.to_string(),
            size: bytes.len() as i64,
            created_at: Utc::now(),
            expires_at,
        };

        self.images.write().await.insert(id, img.clone());
        Ok(img)
    }

    /// Metadata lookup. Does not filter expired entries; callers compare
    /// `expires_at` themselves and delete lazily.
    pub async fn get(&self, id: &ImageId) -> Option<StoredImage> {
        self.images.read().await.get(id).cloned()
    }

    /// Read the backing bytes of a stored image.
    pub async fn read_bytes(&self, img: &StoredImage) -> Result<Vec<u8>, BlobError> {
        Ok(tokio::fs::read(&img.path).await?)
    }

    /// Idempotent removal of metadata and backing bytes. The file delete
    /// happens after the lock is released.
    pub async fn delete(&self, id: &ImageId) {
        let removed = self.images.write().await.remove(id);
        if let Some(img) = removed {
            let _ = tokio::fs::remove_file(&img.path).await;
        }
    }

    /// Delete every image whose expiry has passed. Ids are snapshotted under
    /// the read lock first so file I/O never blocks metadata operations.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<ImageId> = {
            let images = self.images.read().await;
            images
                .values()
                .filter(|img| now > img.expires_at)
                .map(|img| img.id.clone())
                .collect()
        };

        for id in &expired {
            self.delete(id).await;
        }

        expired.len()
    }
}

/// Sniff an image MIME type from leading magic bytes.
///
/// Covers the formats browsers upload; anything unrecognized is rejected by
/// the upload handler.
pub fn sniff_image_mime(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]) {
        Some("image/png")
    } else if head.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("image/jpeg")
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        Some("image/webp")
    } else if head.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}
