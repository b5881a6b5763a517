//! Streaming reads of stored files.
//!
//! `/uploads/file/{*key}` takes a storage key directly. The avatar and attachment
//! routes prepend their namespace, which keeps old links and local-mode
//! references working.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use uploads_core::AppError;
use uploads_storage::keys::{ATTACHMENTS_NAMESPACE, AVATARS_NAMESPACE};

#[tracing::instrument(skip(state), fields(operation = "stream_file"))]
pub async fn stream_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, HttpAppError> {
    stream_key(&state, &key).await
}

#[tracing::instrument(skip(state), fields(operation = "stream_avatar"))]
pub async fn stream_avatar(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, HttpAppError> {
    stream_key(&state, &format!("{}/{}", AVATARS_NAMESPACE, filename)).await
}

#[tracing::instrument(skip(state), fields(operation = "stream_attachment"))]
pub async fn stream_attachment(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, HttpAppError> {
    stream_key(&state, &format!("{}/{}", ATTACHMENTS_NAMESPACE, path)).await
}

async fn stream_key(state: &AppState, key: &str) -> Result<Response, HttpAppError> {
    let object = state.gateway.get_file_stream(key).await?;

    tracing::debug!(key = %key, content_type = %object.content_type, "Streaming file from storage");

    let body_stream = object.stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, object.content_type)
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string()).into()
        })
}
