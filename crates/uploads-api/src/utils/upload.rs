//! Common utilities for file upload handlers

use axum::extract::Multipart;
use axum::http::StatusCode;
use uploads_core::{AppError, FileBlob};
use uploads_storage::DEFAULT_CONTENT_TYPE;

/// Extract the single field named "file" from a multipart form.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<FileBlob, AppError> {
    let mut blob: Option<FileBlob> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        if blob.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let original_name = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        blob = Some(FileBlob::new(data, content_type, original_name));
    }

    blob.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} bytes",
            max_size
        )));
    }
    Ok(())
}

/// Split a wildcard path into folder segments, dropping empty ones.
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
