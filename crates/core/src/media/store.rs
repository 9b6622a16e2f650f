//! Media record store trait and request types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::types::{MediaItem, MediaStatus, Visibility};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Errors from media record operations.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media item not found: {0}")]
    NotFound(String),

    #[error("Invalid media request: {0}")]
    Validation(String),

    #[error("Cannot move media item {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: MediaStatus,
        to: MediaStatus,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl MediaError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<rusqlite::Error> for MediaError {
    fn from(e: rusqlite::Error) -> Self {
        MediaError::Database(e.to_string())
    }
}

/// Request to register a new media item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl CreateMediaRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            visibility: Visibility::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Checks the request, returning it with the title trimmed.
    pub fn validate(mut self) -> Result<Self, MediaError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(MediaError::validation("title must not be empty"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(MediaError::validation(format!(
                "title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(MediaError::validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        Ok(self)
    }
}

/// Filter for listing media items.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    pub status: Option<MediaStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl MediaFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: MediaStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Persistent record store for media items.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Registers a new item in `PendingUpload`.
    async fn create(&self, request: CreateMediaRequest) -> Result<MediaItem, MediaError>;

    /// Looks up an item by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<MediaItem>, MediaError>;

    /// Rewrites an item's status and update timestamp.
    ///
    /// Rejects backwards transitions with [`MediaError::InvalidTransition`].
    async fn update_status(
        &self,
        id: &str,
        status: MediaStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<MediaItem, MediaError>;

    async fn list(&self, filter: &MediaFilter) -> Result<Vec<MediaItem>, MediaError>;

    async fn count(&self, filter: &MediaFilter) -> Result<i64, MediaError>;
}
