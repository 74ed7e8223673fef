//! Request lifecycle handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::info;

use askui_core::{RequestId, StoreError};

use crate::broadcast::UiEvent;
use crate::http::responses::{
    error_response, CreateRequestBody, SubmitResponseBody, WaitParams,
};
use crate::state::AppState;
use crate::store::CreateParams;

const DEFAULT_POLL_WINDOW_SECS: i64 = 60;

/// POST /api/requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid json body"),
    };

    let created = state
        .store
        .create(CreateParams {
            kind: body.kind,
            session_id: body.session_id,
            input: body.input,
            timeout_secs: body.timeout,
        })
        .await;

    match created {
        Ok(req) => {
            state
                .broadcaster
                .broadcast(UiEvent::Created(req.clone()))
                .await;
            info!(id = %req.id, kind = ?req.kind, "created request");
            (StatusCode::CREATED, Json(req)).into_response()
        }
        Err(StoreError::Validation(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /api/requests/:id
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get(&RequestId::new(id)).await {
        Ok(req) => (StatusCode::OK, Json(req)).into_response(),
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, "request not found"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// POST /api/requests/:id/response
pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<SubmitResponseBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid json body"),
    };

    match state.store.complete(&RequestId::new(id), body.output).await {
        Ok(req) => {
            state
                .broadcaster
                .broadcast(UiEvent::Completed(req.clone()))
                .await;
            info!(id = %req.id, "request completed");
            (StatusCode::OK, Json(req)).into_response()
        }
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, "request not found"),
        Err(StoreError::AlreadyCompleted) => {
            error_response(StatusCode::CONFLICT, "request already completed")
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /api/requests/:id/wait?timeout=secs
///
/// Long-poll adapter over the store's wait primitive. A poll that elapses
/// answers 408 so the client can distinguish "still pending, retry" from
/// real failure.
pub async fn wait_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WaitParams>,
) -> Response {
    let timeout_secs = params
        .timeout
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_POLL_WINDOW_SECS);
    let window = Duration::from_secs(timeout_secs as u64);

    match state
        .store
        .wait_with_timeout(&RequestId::new(id), window)
        .await
    {
        Ok(req) => (StatusCode::OK, Json(req)).into_response(),
        Err(StoreError::NotFound) => error_response(StatusCode::NOT_FOUND, "request not found"),
        Err(StoreError::WaitTimeout) => {
            error_response(StatusCode::REQUEST_TIMEOUT, "timeout waiting for response")
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}
