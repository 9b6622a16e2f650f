//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the pipeline's collaborator
//! traits, so the orchestrator and HTTP layer can be exercised end to end
//! without ffmpeg or a real object store.
//!
//! # Example
//!
//! ```rust,ignore
//! use vodpipe_core::testing::{fixtures, MockBlobStore, MockEncoder, MockMediaStore};
//!
//! let store = MockMediaStore::new();
//! store.insert(fixtures::pending_item("v1")).await;
//!
//! let blobs = MockBlobStore::new();
//! blobs.put_object("raw-videos/v1.mp4", b"raw".to_vec()).await;
//!
//! let encoder = MockEncoder::new();
//! encoder.fail_on_call(2).await;
//! ```

mod mock_blob_store;
mod mock_encoder;
mod mock_media_store;

pub use mock_blob_store::MockBlobStore;
pub use mock_encoder::MockEncoder;
pub use mock_media_store::MockMediaStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::media::{MediaItem, MediaStatus, Visibility};

    /// A media item waiting for processing.
    pub fn pending_item(id: &str) -> MediaItem {
        let now = Utc::now();
        MediaItem {
            id: id.to_string(),
            title: format!("Test video {}", id),
            description: String::new(),
            visibility: Visibility::Public,
            status: MediaStatus::PendingUpload,
            source_key: MediaItem::source_key_for(id),
            output_prefix: MediaItem::output_prefix_for(id),
            created_at: now,
            updated_at: now,
        }
    }

    /// A media item in the given status.
    pub fn item_with_status(id: &str, status: MediaStatus) -> MediaItem {
        MediaItem {
            status,
            ..pending_item(id)
        }
    }
}
