use crate::traits::{Storage, StorageError, StorageResult, StoredObject, DEFAULT_CONTENT_TYPE};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::sync::Arc;
use uploads_core::S3Credentials;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance from an explicit credential set.
    ///
    /// Credentials come only from configuration; nothing is picked up from the
    /// ambient AWS environment.
    pub fn new(credentials: &S3Credentials) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_region(credentials.region.clone())
            .with_bucket_name(credentials.bucket.clone())
            .with_access_key_id(credentials.access_key_id.clone())
            .with_secret_access_key(credentials.secret_access_key.clone());

        if let Some(ref token) = credentials.session_token {
            builder = builder.with_token(token.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_store(Arc::new(store), credentials.bucket.clone()))
    }

    /// Wrap an already built object store (an in-memory store in tests).
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        S3Storage {
            store,
            bucket: bucket.into(),
        }
    }

    fn location(storage_key: &str) -> Path {
        Path::from(storage_key)
    }

    /// Storage key for a listed location. Paths percent-encode reserved
    /// characters, so decoding restores the key the object was written under.
    fn key_of(location: &Path) -> String {
        let encoded: &str = location.as_ref();
        urlencoding::decode(encoded)
            .map(|key| key.into_owned())
            .unwrap_or_else(|_| encoded.to_string())
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Self::location(key);
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn get_stream(&self, key: &str) -> StorageResult<StoredObject> {
        let start = std::time::Instant::now();
        let location = Self::location(key);

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bucket = self.bucket.clone();
        let storage_key = key.to_string();
        let stream = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(StoredObject {
            stream: Box::pin(stream),
            content_type,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(key);

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        let start = std::time::Instant::now();
        let locations: Vec<ObjectResult<Path>> =
            keys.iter().map(|key| Ok(Self::location(key))).collect();

        let mut results = self
            .store
            .delete_stream(futures::stream::iter(locations).boxed());

        let mut deleted = 0;
        let mut failures = Vec::new();
        while let Some(result) = results.next().await {
            match result {
                Ok(_) | Err(ObjectStoreError::NotFound { .. }) => deleted += 1,
                Err(e) => failures.push(e.to_string()),
            }
        }

        if !failures.is_empty() {
            tracing::error!(
                bucket = %self.bucket,
                requested = keys.len(),
                failed = failures.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 batch delete failed"
            );
            return Err(StorageError::DeleteFailed(failures.join("; ")));
        }

        tracing::info!(
            bucket = %self.bucket,
            deleted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 batch delete successful"
        );

        Ok(deleted)
    }

    /// The object store client follows continuation tokens, so the stream
    /// covers every page of the listing.
    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let location = Self::location(prefix);
        let mut listing = self.store.list(Some(&location));

        let mut found = Vec::new();
        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    "S3 list failed"
                );
                StorageError::BackendError(e.to_string())
            })?;
            found.push(Self::key_of(&meta.location));
        }

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = found.len(),
            "S3 list successful"
        );

        Ok(found)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_storage() -> S3Storage {
        S3Storage::with_store(Arc::new(InMemory::new()), "test-bucket")
    }

    async fn read_all(storage: &S3Storage, key: &str) -> (Vec<u8>, String) {
        let mut object = storage.get_stream(key).await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = object.stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        (downloaded, object.content_type)
    }

    #[test]
    fn test_new_accepts_complete_credentials() {
        let storage = S3Storage::new(&S3Credentials {
            region: "eu-west-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
            bucket: "uploads".to_string(),
        })
        .unwrap();
        assert_eq!(storage.bucket, "uploads");
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }

    #[tokio::test]
    async fn test_put_get_preserves_content_type() {
        let storage = memory_storage();
        storage
            .put(
                "attachments/p/id-notes.txt",
                Bytes::from_static(b"hello"),
                "text/plain",
            )
            .await
            .unwrap();

        let (data, content_type) = read_all(&storage, "attachments/p/id-notes.txt").await;
        assert_eq!(data, b"hello");
        assert_eq!(content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = memory_storage();
        let result = storage.get_stream("avatars/missing.webp").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = memory_storage();
        storage
            .put("avatars/a.webp", Bytes::from_static(b"img"), "image/webp")
            .await
            .unwrap();

        storage.delete("avatars/a.webp").await.unwrap();
        storage.delete("avatars/a.webp").await.unwrap();

        let result = storage.get_stream("avatars/a.webp").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete_prefix() {
        let storage = memory_storage();
        for key in [
            "attachments/p/one.txt",
            "attachments/p/t/two #2.txt",
            "attachments/pp/three.txt",
        ] {
            storage
                .put(key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }

        let mut listed = storage.list_by_prefix("attachments/p/").await.unwrap();
        listed.sort();
        assert_eq!(
            listed,
            vec![
                "attachments/p/one.txt".to_string(),
                "attachments/p/t/two #2.txt".to_string()
            ]
        );

        assert_eq!(storage.delete_prefix("attachments/p/").await.unwrap(), 2);
        assert!(storage
            .list_by_prefix("attachments/p/")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            storage.list_by_prefix("attachments/pp/").await.unwrap(),
            vec!["attachments/pp/three.txt".to_string()]
        );

        // Nothing left to match
        assert_eq!(storage.delete_prefix("attachments/p/").await.unwrap(), 0);
    }
}
