use crate::keys::{self, ATTACHMENTS_NAMESPACE, AVATARS_NAMESPACE};
use crate::traits::{Storage, StorageError, StorageResult, StoredObject, DEFAULT_CONTENT_TYPE};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// Creates `base_path` together with the `avatars/` and `attachments/`
    /// subtrees if they are missing.
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/uploads")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        for namespace in [AVATARS_NAMESPACE, ATTACHMENTS_NAMESPACE] {
            let dir = base_path.join(namespace);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        keys::validate_key(storage_key)?;
        Ok(self.base_path.join(storage_key))
    }

    /// Storage key for a file below the base path, always `/`-separated.
    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn is_file(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create directory for {}: {}",
                path.display(),
                e
            ))
        })?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn get_stream(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !Self::is_file(&path).await {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let storage_key = key.to_string();
        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(StoredObject {
            stream: Box::pin(stream),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            // Already gone, possibly removed by an overlapping delete
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "Local storage delete skipped, file does not exist");
                return Ok(());
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        let mut deleted = 0;
        let mut failures = Vec::new();

        for key in keys {
            match self.delete(key).await {
                Ok(()) => deleted += 1,
                Err(e) => failures.push(format!("{}: {}", key, e)),
            }
        }

        if !failures.is_empty() {
            return Err(StorageError::DeleteFailed(failures.join("; ")));
        }

        Ok(deleted)
    }

    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let root = self.key_to_path(prefix.trim_end_matches('/'))?;

        let mut found = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::BackendError(format!(
                        "Failed to read directory {}: {}",
                        dir.display(),
                        e
                    )));
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.path_to_key(&path) {
                    found.push(key);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Removes the whole directory tree rather than the files one by one, so no
    /// empty folders are left behind.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let root = self.key_to_path(prefix.trim_end_matches('/'))?;
        let start = std::time::Instant::now();

        let removed = self.list_by_prefix(prefix).await?.len();

        match fs::remove_dir_all(&root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    root.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %root.display(),
            prefix = %prefix,
            removed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage directory delete successful"
        );

        Ok(removed)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn read_all(storage: &LocalStorage, key: &str) -> Vec<u8> {
        let mut object = storage.get_stream(key).await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = object.stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        downloaded
    }

    #[tokio::test]
    async fn test_new_creates_namespaces() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("store");
        LocalStorage::new(&base).await.unwrap();

        assert!(base.join("avatars").is_dir());
        assert!(base.join("attachments").is_dir());

        // Idempotent
        LocalStorage::new(&base).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage_put_stream() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let key = "attachments/a/b/c/file.txt";
        storage
            .put(key, Bytes::from_static(b"test data"), "text/plain")
            .await
            .unwrap();

        assert!(dir.path().join("attachments/a/b/c/file.txt").is_file());

        let object = storage.get_stream(key).await.unwrap();
        assert_eq!(object.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(read_all(&storage, key).await, b"test data");
    }

    #[tokio::test]
    async fn test_get_stream_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get_stream("avatars/missing.webp").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        // Directories are not files
        let result = storage.get_stream("attachments").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get_stream("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .put("/etc/passwd", Bytes::from_static(b"x"), "text/plain")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(storage.delete("nonexistent/file.txt").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_deletes_succeed() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        for round in 0..20 {
            let key = format!("attachments/p/{}/file.txt", round);
            storage
                .put(&key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();

            let mut tasks = Vec::new();
            for i in 0..8 {
                let storage = storage.clone();
                let key = key.clone();
                tasks.push(tokio::spawn(async move {
                    if i % 2 == 0 {
                        storage.delete(&key).await.map(|_| ())
                    } else {
                        storage.delete_prefix("attachments/p/").await.map(|_| ())
                    }
                }));
            }
            for task in tasks {
                assert!(task.await.unwrap().is_ok());
            }
            assert!(!dir.path().join(&key).exists());
        }
    }

    #[tokio::test]
    async fn test_list_and_delete_prefix() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        for key in [
            "attachments/p/one.txt",
            "attachments/p/t/two.txt",
            "attachments/pp/three.txt",
        ] {
            storage
                .put(key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }

        let listed = storage.list_by_prefix("attachments/p/").await.unwrap();
        assert_eq!(
            listed,
            vec![
                "attachments/p/one.txt".to_string(),
                "attachments/p/t/two.txt".to_string()
            ]
        );

        assert_eq!(storage.delete_prefix("attachments/p/").await.unwrap(), 2);
        assert!(!dir.path().join("attachments/p").exists());
        assert!(dir.path().join("attachments/pp/three.txt").is_file());

        // Absent folder is a no-op
        assert_eq!(storage.delete_prefix("attachments/p/").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let keys = vec!["avatars/a.webp".to_string(), "avatars/b.webp".to_string()];
        for key in &keys {
            storage
                .put(key, Bytes::from_static(b"img"), "image/webp")
                .await
                .unwrap();
        }

        assert_eq!(storage.delete_batch(&keys).await.unwrap(), 2);
        assert!(storage.list_by_prefix("avatars/").await.unwrap().is_empty());
    }
}
