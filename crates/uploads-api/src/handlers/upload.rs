use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::{extract_multipart_file, split_segments, validate_file_size};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uploads_core::StoredAttachment;

#[derive(Debug, Serialize)]
pub struct AvatarUploadResponse {
    pub url: String,
}

/// Store a multipart `file` field as a 256x256 avatar.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_avatar"))]
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let start = Instant::now();
    let blob = extract_multipart_file(multipart).await?;
    validate_file_size(blob.len(), state.config.max_upload_size_bytes())?;

    let url = state.gateway.store_avatar(&blob).await?;

    tracing::info!(
        url = %url,
        size_bytes = blob.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Avatar uploaded"
    );

    Ok((StatusCode::CREATED, Json(AvatarUploadResponse { url })))
}

/// Store a multipart `file` field below the folder given by the wildcard path.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_attachment"))]
pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    store_attachment(&state, &split_segments(&path), multipart).await
}

/// Store a multipart `file` field directly under the attachments namespace.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_attachment"))]
pub async fn upload_root_attachment(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    store_attachment(&state, &[], multipart).await
}

async fn store_attachment(
    state: &AppState,
    segments: &[String],
    multipart: Multipart,
) -> Result<(StatusCode, Json<StoredAttachment>), HttpAppError> {
    let start = Instant::now();
    let blob = extract_multipart_file(multipart).await?;
    validate_file_size(blob.len(), state.config.max_upload_size_bytes())?;

    let stored = state.gateway.store_attachment(&blob, segments).await?;

    tracing::info!(
        url = %stored.url,
        kind = stored.kind.as_str(),
        size_bytes = blob.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Attachment uploaded"
    );

    Ok((StatusCode::CREATED, Json(stored)))
}
