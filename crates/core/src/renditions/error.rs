//! Error types for the renditions module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single encoder invocation.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Encoder (or `nice`) binary not found.
    #[error("Encoder binary not found: {path}")]
    NotFound { path: PathBuf },

    /// The process exited unsuccessfully.
    #[error("Encoding failed: {reason}")]
    Failed {
        reason: String,
        /// Last lines the encoder wrote to stderr.
        stderr: Option<String>,
    },

    #[error("Encoding timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncoderError {
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Errors from producing a full rendition set.
#[derive(Debug, Error)]
pub enum RenditionError {
    #[error("No rendition variants configured")]
    EmptyLadder,

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Input path has no file name: {path}")]
    InvalidInput { path: PathBuf },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding variant {variant} failed: {source}")]
    Encode {
        variant: String,
        #[source]
        source: EncoderError,
    },

    #[error("Failed to write manifest: {0}")]
    Manifest(#[source] std::io::Error),
}

impl RenditionError {
    /// Name of the variant whose encode failed, if any.
    pub fn failed_variant(&self) -> Option<&str> {
        match self {
            Self::Encode { variant, .. } => Some(variant),
            _ => None,
        }
    }
}
