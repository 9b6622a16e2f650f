//! Filesystem-backed blob store with HMAC-signed upload URLs.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::config::StorageConfig;
use super::error::StorageError;
use super::traits::BlobStore;

type HmacSha256 = Hmac<Sha256>;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+(/[A-Za-z0-9_.-]+)*$").unwrap());

/// Checks that `key` is a relative slash-separated path without `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if !KEY_PATTERN.is_match(key) || key.split('/').any(|seg| seg == "." || seg == "..") {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

/// Blob store that keeps objects as files under a root directory.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
    secret: Vec<u8>,
}

impl FsBlobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        secret: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.root,
            &config.public_base_url,
            config.signing_secret.as_bytes(),
        )
    }

    /// Directory objects are stored under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of the object stored under `key`.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }

    fn mac(&self) -> Result<HmacSha256, StorageError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| StorageError::Signing(e.to_string()))
    }

    fn sign(&self, key: &str, expires: u64) -> Result<String, StorageError> {
        let mut mac = self.mac()?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Builds the signed upload URL for `key`, valid until the unix time `expires`.
    pub fn signed_upload_url(&self, key: &str, expires: u64) -> Result<String, StorageError> {
        validate_key(key)?;
        let sig = self.sign(key, expires)?;
        let encoded_key = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!(
            "{}/api/v1/blobs/{}?expires={}&sig={}",
            self.public_base_url, encoded_key, expires, sig
        ))
    }

    /// Checks a signed upload request for `key`.
    pub fn verify_upload(&self, key: &str, expires: u64, sig: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        if expires <= unix_now() {
            return Err(StorageError::Expired);
        }

        let provided = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| StorageError::SignatureMismatch)?;

        let mut mac = self.mac()?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| StorageError::SignatureMismatch)
    }

    /// Stores `body` under `key`, replacing any existing object. Returns bytes written.
    pub async fn write_object(&self, key: &str, body: &[u8]) -> Result<u64, StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(key, bytes = body.len(), "Stored object");
        Ok(body.len() as u64)
    }

    /// Whether an object is stored under `key`.
    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let source = self.object_path(key)?;
        if !tokio::fs::try_exists(&source).await? {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, local_path).await?;
        debug!(key, path = %local_path.display(), "Downloaded object");
        Ok(())
    }

    async fn upload(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let dest = self.object_path(key)?;
        if !tokio::fs::try_exists(local_path).await? {
            return Err(StorageError::LocalFileNotFound {
                path: local_path.to_path_buf(),
            });
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &dest).await?;
        debug!(key, path = %local_path.display(), "Uploaded object");
        Ok(())
    }

    async fn cleanup(&self, local_path: &Path) -> Result<(), StorageError> {
        let meta = match tokio::fs::metadata(local_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            tokio::fs::remove_dir_all(local_path).await?;
        } else {
            tokio::fs::remove_file(local_path).await?;
        }
        Ok(())
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<String, StorageError> {
        let expires = unix_now().saturating_add(expiry.as_secs());
        self.signed_upload_url(key, expires)
    }
}
