//! Best-effort deletes. Both routes answer 204 whatever the backend reports;
//! failures end up in the logs.

use crate::error::ValidatedJson;
use crate::state::AppState;
use crate::utils::upload::split_segments;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DeleteFileRequest {
    /// Reference previously returned by an upload
    pub url: String,
}

#[tracing::instrument(skip(state, request), fields(operation = "delete_file", url = %request.url))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteFileRequest>,
) -> StatusCode {
    state.gateway.delete_file(&request.url).await;
    StatusCode::NO_CONTENT
}

#[tracing::instrument(skip(state), fields(operation = "delete_folder"))]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> StatusCode {
    state.gateway.delete_folder(&split_segments(&path)).await;
    StatusCode::NO_CONTENT
}
