//! Configuration for the filesystem blob store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`FsBlobStore`](super::FsBlobStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory objects are stored under.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Base URL clients reach this service at, used to build signed upload URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// HMAC key for signed upload URLs.
    #[serde(default)]
    pub signing_secret: String,

    /// How long a signed upload URL stays valid, in seconds.
    #[serde(default = "default_upload_url_ttl")]
    pub upload_url_ttl_secs: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_upload_url_ttl() -> u64 {
    15 * 60
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            public_base_url: default_public_base_url(),
            signing_secret: String::new(),
            upload_url_ttl_secs: default_upload_url_ttl(),
        }
    }
}
