//! Media item and processing event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every per-item notification topic.
pub const TOPIC_PREFIX: &str = "video_processing:";

/// Notification topic for a media item.
pub fn topic(item_id: &str) -> String {
    format!("{}{}", TOPIC_PREFIX, item_id)
}

/// Lifecycle status of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    /// Created, waiting for the raw upload.
    PendingUpload,
    /// Renditions are being produced.
    Processing,
    /// Renditions are uploaded and playable.
    Ready,
    /// Processing failed.
    Error,
}

impl MediaStatus {
    /// Stable string form, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::PendingUpload => "pending_upload",
            MediaStatus::Processing => "processing",
            MediaStatus::Ready => "ready",
            MediaStatus::Error => "error",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_upload" => Some(MediaStatus::PendingUpload),
            "processing" => Some(MediaStatus::Processing),
            "ready" => Some(MediaStatus::Ready),
            "error" => Some(MediaStatus::Error),
            _ => None,
        }
    }

    /// Whether moving from this status to `next` is a forward transition.
    pub fn can_transition_to(&self, next: MediaStatus) -> bool {
        matches!(
            (self, next),
            (MediaStatus::PendingUpload, MediaStatus::Processing)
                | (MediaStatus::Processing, MediaStatus::Ready)
                | (MediaStatus::Processing, MediaStatus::Error)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Ready | MediaStatus::Error)
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who can see a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "unlisted" => Some(Visibility::Unlisted),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A media item tracked by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    pub status: MediaStatus,
    /// Blob key of the raw upload.
    pub source_key: String,
    /// Blob key prefix under which processed output is stored.
    pub output_prefix: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    /// Blob key of the raw upload for `id`.
    pub fn source_key_for(id: &str) -> String {
        format!("raw-videos/{}.mp4", id)
    }

    /// Blob key prefix for processed output of `id`.
    pub fn output_prefix_for(id: &str) -> String {
        format!("processed-videos/{}", id)
    }

    /// Blob key of the multi-variant manifest once processing is done.
    pub fn manifest_key(&self) -> String {
        format!("{}/playlist.m3u8", self.output_prefix)
    }
}

/// Kind of a processing lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StatusUpdate,
    Started,
    Completed,
    Failed,
}

impl EventKind {
    /// Whether this event ends an invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Completed | EventKind::Failed)
    }
}

/// A lifecycle notification published while an item is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEvent {
    pub item_id: String,
    pub event_type: EventKind,
    pub status: MediaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingEvent {
    /// Creates an event stamped with the current time.
    pub fn new(item_id: impl Into<String>, event_type: EventKind, status: MediaStatus) -> Self {
        Self {
            item_id: item_id.into(),
            event_type,
            status,
            message: None,
            progress: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets progress, clamped to 100.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
