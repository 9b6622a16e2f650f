//! Trait definitions for the storage module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::StorageError;

/// Object storage holding raw uploads and processed renditions.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copies the object at `key` to `local_path`, replacing any existing file.
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;

    /// Stores the file at `local_path` under `key`.
    async fn upload(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;

    /// Removes a local scratch file or directory. Missing paths are not an error.
    async fn cleanup(&self, local_path: &Path) -> Result<(), StorageError>;

    /// Returns a URL a client can `PUT` the object body to until `expiry` elapses.
    async fn presigned_upload_url(&self, key: &str, expiry: Duration)
        -> Result<String, StorageError>;
}
