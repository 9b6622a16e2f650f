//! Processing orchestrator.
//!
//! Takes a media item whose raw upload is in the blob store and drives it to
//! `Ready`: download to scratch, encode the rendition ladder, upload every
//! output file under the item's prefix, persist the new status. Each
//! transition is announced on the broker under `video_processing:{id}`.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ProcessingOrchestrator;
pub use types::{OrchestratorError, Stage, StageFailure};
