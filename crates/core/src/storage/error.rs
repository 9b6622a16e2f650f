//! Error types for the storage module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is empty, absolute, or contains disallowed segments.
    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },

    /// No object is stored under the key.
    #[error("Blob not found: {key}")]
    NotFound { key: String },

    /// Local file to upload does not exist.
    #[error("Local file not found: {path}")]
    LocalFileNotFound { path: PathBuf },

    /// The signed URL has expired.
    #[error("Signed URL expired")]
    Expired,

    /// The signature does not match the key and expiry.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// The signing key could not be used.
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Whether this error is a rejected signed request.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Expired | Self::SignatureMismatch)
    }
}
