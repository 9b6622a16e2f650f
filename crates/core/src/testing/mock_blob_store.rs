//! Mock blob store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{BlobStore, StorageError};

/// Mock implementation of the BlobStore trait.
///
/// Objects live in memory; downloads write real local files and cleanup
/// really removes them, so scratch-directory behavior can be asserted.
#[derive(Debug)]
pub struct MockBlobStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Keys uploaded, in upload order.
    uploads: Arc<RwLock<Vec<String>>>,
    /// Local paths passed to cleanup, in call order.
    cleaned: Arc<RwLock<Vec<PathBuf>>>,
    download_error: Arc<RwLock<Option<StorageError>>>,
    upload_error: Arc<RwLock<Option<StorageError>>>,
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            uploads: Arc::new(RwLock::new(Vec::new())),
            cleaned: Arc::new(RwLock::new(Vec::new())),
            download_error: Arc::new(RwLock::new(None)),
            upload_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Store an object directly.
    pub async fn put_object(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(key.into(), body.into());
    }

    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.read().await.clone()
    }

    pub async fn cleaned_paths(&self) -> Vec<PathBuf> {
        self.cleaned.read().await.clone()
    }

    /// Configure the next download to fail with the given error.
    pub async fn set_download_error(&self, error: StorageError) {
        *self.download_error.write().await = Some(error);
    }

    /// Configure the next upload to fail with the given error.
    pub async fn set_upload_error(&self, error: StorageError) {
        *self.upload_error.write().await = Some(error);
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        if let Some(error) = self.download_error.write().await.take() {
            return Err(error);
        }
        let body = self.object(key).await.ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, body).await?;
        Ok(())
    }

    async fn upload(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        if let Some(error) = self.upload_error.write().await.take() {
            return Err(error);
        }
        let body = tokio::fs::read(local_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::LocalFileNotFound {
                    path: local_path.to_path_buf(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        self.put_object(key, body).await;
        self.uploads.write().await.push(key.to_string());
        Ok(())
    }

    async fn cleanup(&self, local_path: &Path) -> Result<(), StorageError> {
        self.cleaned.write().await.push(local_path.to_path_buf());
        match tokio::fs::metadata(local_path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(local_path).await?,
            Ok(_) => tokio::fs::remove_file(local_path).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("mock://upload/{}?ttl={}", key, expiry.as_secs()))
    }
}
