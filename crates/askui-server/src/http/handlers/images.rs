//! Image upload and serving handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use askui_core::ImageId;

use crate::http::responses::{error_response, UploadImageResponse};
use crate::images::sniff_image_mime;
use crate::state::AppState;

const DEFAULT_TTL_SECS: i64 = 3600;

/// POST /api/images
///
/// Multipart form: `file` (required), `ttlSeconds` (optional). The MIME type
/// is sniffed from the leading bytes; only image content is accepted.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let Some(images) = &state.images else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "image uploads not available");
    };

    let mut ttl_secs = DEFAULT_TTL_SECS;
    let mut file_bytes: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), "invalid multipart form"),
        };
        match field.name() {
            Some("ttlSeconds") => {
                if let Ok(text) = field.text().await {
                    if let Ok(ttl) = text.parse::<i64>() {
                        if ttl > 0 {
                            ttl_secs = ttl;
                        }
                    }
                }
            }
            Some("file") => match field.bytes().await {
                Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                Err(e) => return error_response(e.status(), "failed to read upload"),
            },
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return error_response(StatusCode::BAD_REQUEST, "missing file field");
    };
    if bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty file");
    }
    if bytes.len() as i64 > images.max_upload_bytes() {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "upload too large");
    }
    let Some(mime_type) = sniff_image_mime(&bytes) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid content-type (expected image/*)",
        );
    };

    // Both `seconds` and the plain `+` panic near the representable edge;
    // the ttl comes straight off the wire.
    let Some(expires_at) = chrono::Duration::try_seconds(ttl_secs)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
    else {
        return error_response(StatusCode::BAD_REQUEST, "ttlSeconds out of range");
    };
    match images.put(&bytes, mime_type, expires_at).await {
        Ok(img) => {
            info!(id = %img.id, mime_type = %img.mime_type, size = img.size, "stored image");
            (
                StatusCode::CREATED,
                Json(UploadImageResponse {
                    id: img.id.as_str().to_string(),
                    url: format!("/api/images/{}", img.id),
                    mime_type: img.mime_type,
                    size: img.size,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to store image");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to store image")
        }
    }
}

/// GET /api/images/:id
///
/// Expiry here is lazy: an expired or unreadable entry is deleted and
/// answered 404. The sweeper handles the rest on its own timer.
pub async fn get_image(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(images) = &state.images else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "image serving not available");
    };

    let id = ImageId::new(id);
    let Some(img) = images.get(&id).await else {
        return error_response(StatusCode::NOT_FOUND, "not found");
    };

    if Utc::now() > img.expires_at {
        images.delete(&id).await;
        return error_response(StatusCode::NOT_FOUND, "not found");
    }

    match images.read_bytes(&img).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, img.mime_type),
                // Conservative: these are ephemeral and may be deleted soon.
                (header::CACHE_CONTROL, "private, max-age=60".to_string()),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => {
            images.delete(&id).await;
            error_response(StatusCode::NOT_FOUND, "not found")
        }
    }
}
