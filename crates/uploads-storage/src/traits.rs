//! Storage abstraction trait
//!
//! This module defines the Storage trait that both storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Content type reported when the backend has none recorded.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazily produced file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// An opened object: its byte stream plus the content type to serve it with.
pub struct StoredObject {
    pub stream: ByteStream,
    pub content_type: String,
}

/// Storage abstraction trait
///
/// Both backends (S3, local filesystem) implement this trait, so the gateway
/// never branches on backend presence. All keys are backend-relative storage
/// keys as described in the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `key`. Backends without metadata support ignore `content_type`.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Open an object for streaming.
    ///
    /// Returns `StorageError::NotFound` before any bytes are produced when the key
    /// does not exist.
    async fn get_stream(&self, key: &str) -> StorageResult<StoredObject>;

    /// Delete a single object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Delete many objects in one request where the backend allows it.
    /// Returns the number of keys the backend acknowledged.
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize>;

    /// List every key below `prefix`, following pagination to the end.
    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Delete every key below `prefix`. Returns the number of deleted keys.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let keys = self.list_by_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.delete_batch(&keys).await
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
