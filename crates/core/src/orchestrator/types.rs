//! Types for the processing orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{MediaError, MediaStatus};

/// Errors returned synchronously by `start_processing`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No media item with this id.
    #[error("media item not found: {0}")]
    NotFound(String),

    /// The item is not waiting for processing.
    #[error("media item {id} cannot be processed in status {status}")]
    InvalidState { id: String, status: MediaStatus },

    /// A run for this item is already in flight.
    #[error("media item {0} is already being processed")]
    AlreadyProcessing(String),

    /// Record store error.
    #[error("media store error: {0}")]
    Store(#[from] MediaError),
}

/// Pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DirectoryCreation,
    Download,
    Transcoding,
    ReadingOutput,
    Upload,
    DatabaseUpdate,
}

impl Stage {
    /// Human-readable label used in failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::DirectoryCreation => "directory creation",
            Stage::Download => "video download",
            Stage::Transcoding => "video transcoding",
            Stage::ReadingOutput => "reading output directory",
            Stage::Upload => "video upload",
            Stage::DatabaseUpdate => "database update",
        }
    }

    /// Short metric label.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Stage::DirectoryCreation => "directory_creation",
            Stage::Download => "download",
            Stage::Transcoding => "transcoding",
            Stage::ReadingOutput => "reading_output",
            Stage::Upload => "upload",
            Stage::DatabaseUpdate => "database_update",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A pipeline stage that failed, with the underlying error text.
#[derive(Debug, Clone, Error)]
#[error("Error during {stage}: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    pub error: String,
}

impl StageFailure {
    pub fn new(stage: Stage, error: impl std::fmt::Display) -> Self {
        Self {
            stage,
            error: error.to_string(),
        }
    }

    /// Message carried by the `Failed` event.
    pub fn message(&self) -> String {
        format!("Error during {}", self.stage)
    }
}
