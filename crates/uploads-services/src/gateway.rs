//! Storage gateway
//!
//! Stores avatars and attachments, streams them back, and cleans them up. The
//! backend is chosen once from configuration and injected; every method works
//! the same way against either backend and only the shape of the returned
//! reference reveals which one is active.

use crate::reference::{self, ReferenceShape};
use std::sync::Arc;
use uploads_core::{
    AttachmentKind, CleanupReporter, Config, DeleteFailure, FileBlob, NoOpCleanupReporter,
    StoredAttachment,
};
use uploads_processing::{AvatarImage, AvatarTransformer, ProcessingError};
use uploads_storage::keys;
use uploads_storage::{create_storage, Storage, StorageBackend, StorageError, StoredObject};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Create the gateway for the backend selected by `config`.
pub async fn create_gateway(config: &Config) -> GatewayResult<StorageGateway> {
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        "Storage gateway initialized"
    );
    Ok(StorageGateway::new(storage))
}

#[derive(Clone)]
pub struct StorageGateway {
    storage: Arc<dyn Storage>,
    reporter: Arc<dyn CleanupReporter>,
}

impl StorageGateway {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            reporter: Arc::new(NoOpCleanupReporter),
        }
    }

    /// Route best-effort delete failures to `reporter` in addition to the log.
    pub fn with_reporter(mut self, reporter: Arc<dyn CleanupReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn backend(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    /// Resize an avatar to a 256x256 WebP and store it under a fresh name.
    ///
    /// No reference is returned unless the write succeeded.
    #[tracing::instrument(skip(self, blob), fields(size_bytes = blob.len(), backend = %self.backend()))]
    pub async fn store_avatar(&self, blob: &FileBlob) -> GatewayResult<String> {
        let data = blob.data.clone();
        let avatar = tokio::task::spawn_blocking(move || AvatarTransformer::transform(&data))
            .await
            .map_err(|e| GatewayError::Task(e.to_string()))??;

        let key = keys::generate_avatar_key(AvatarImage::EXTENSION);
        self.storage
            .put(&key, avatar.data, AvatarImage::CONTENT_TYPE)
            .await?;

        Ok(reference::external_reference(self.backend(), &key))
    }

    /// Store an attachment byte-for-byte below the sanitized folder `segments`.
    #[tracing::instrument(
        skip(self, blob),
        fields(size_bytes = blob.len(), content_type = %blob.content_type, backend = %self.backend())
    )]
    pub async fn store_attachment(
        &self,
        blob: &FileBlob,
        segments: &[String],
    ) -> GatewayResult<StoredAttachment> {
        let kind = AttachmentKind::from_content_type(&blob.content_type);
        let filename = keys::generate_attachment_filename(&blob.original_name);
        let key = keys::attachment_key(segments, &filename);

        self.storage
            .put(&key, blob.data.clone(), &blob.content_type)
            .await?;

        Ok(StoredAttachment {
            url: reference::external_reference(self.backend(), &key),
            kind,
            original_name: blob.original_name.clone(),
        })
    }

    /// Open a stored file by storage key (not by reference).
    pub async fn get_file_stream(&self, key: &str) -> GatewayResult<StoredObject> {
        keys::validate_key(key)?;
        Ok(self.storage.get_stream(key).await?)
    }

    /// Delete the file behind `reference`. Never fails; see `CleanupReporter`.
    #[tracing::instrument(skip(self), fields(backend = %self.backend()))]
    pub async fn delete_file(&self, reference: &str) {
        let backend = self.backend();

        let shape = match reference::parse_reference(reference) {
            Ok(shape) => shape,
            Err(e) => {
                self.report_failure(reference, e.to_string());
                return;
            }
        };

        let key = match (backend, shape) {
            (StorageBackend::S3, ReferenceShape::Remote { key })
            | (StorageBackend::S3, ReferenceShape::LegacyUrl { key }) => key,
            (StorageBackend::S3, ReferenceShape::Local { .. }) => {
                tracing::warn!(
                    reference = %reference,
                    "Local reference ignored, local storage is not active"
                );
                return;
            }
            (StorageBackend::Local, ReferenceShape::LegacyUrl { .. }) => {
                tracing::warn!(
                    reference = %reference,
                    "Legacy object URL ignored, S3 storage is not active"
                );
                return;
            }
            (StorageBackend::Local, _) => reference::local_key(reference),
        };

        match self.storage.delete(&key).await {
            Ok(()) => tracing::debug!(key = %key, "File deleted"),
            Err(e) => self.report_failure(reference, e.to_string()),
        }
    }

    /// Delete every attachment below the folder `segments`. Never fails.
    ///
    /// An empty segment list names the whole attachments namespace and is ignored.
    #[tracing::instrument(skip(self), fields(backend = %self.backend()))]
    pub async fn delete_folder(&self, segments: &[String]) {
        let Some(prefix) = keys::attachment_prefix(segments) else {
            tracing::warn!("Refusing to delete the attachments root");
            return;
        };

        match self.storage.delete_prefix(&prefix).await {
            Ok(0) => tracing::debug!(prefix = %prefix, "Folder empty, nothing to delete"),
            Ok(deleted) => tracing::info!(prefix = %prefix, deleted, "Folder deleted"),
            Err(e) => self.report_failure(&prefix, e.to_string()),
        }
    }

    fn report_failure(&self, target: &str, reason: String) {
        let failure = DeleteFailure {
            backend: self.backend(),
            target: target.to_string(),
            reason,
        };
        tracing::warn!(
            backend = %failure.backend,
            target = %failure.target,
            reason = %failure.reason,
            "Best-effort delete failed"
        );
        self.reporter.report_delete_failure(&failure);
    }
}
