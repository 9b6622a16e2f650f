//! Blob storage for raw uploads and processed renditions.
//!
//! The [`BlobStore`] trait is what the processing pipeline depends on.
//! [`FsBlobStore`] keeps objects on the local filesystem and hands out
//! HMAC-signed, time-limited upload URLs that the HTTP layer verifies.

mod config;
mod error;
mod fs;
mod traits;

pub use config::StorageConfig;
pub use error::StorageError;
pub use fs::{validate_key, FsBlobStore};
pub use traits::BlobStore;
