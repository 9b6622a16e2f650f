//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the processing orchestrator (`[processing]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Local scratch root. Raw downloads go to `{scratch_dir}/raw-videos`,
    /// rendition output to `{scratch_dir}/processed-videos`.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Maximum pipelines running at once (0 = unlimited).
    /// Accepted runs beyond the limit wait for a free slot before starting.
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("vodpipe")
}

impl OrchestratorConfig {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            max_concurrent_jobs: 0,
        }
    }

    /// Directory raw uploads are downloaded into.
    pub fn raw_dir(&self) -> PathBuf {
        self.scratch_dir.join("raw-videos")
    }

    /// Directory rendition output directories are created in.
    pub fn processed_dir(&self) -> PathBuf {
        self.scratch_dir.join("processed-videos")
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            max_concurrent_jobs: 0,
        }
    }
}
