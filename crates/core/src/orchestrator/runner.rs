//! Processing orchestrator implementation.
//!
//! Drives one media item from `PendingUpload` through rendition encoding to
//! `Ready` (or `Error`), publishing lifecycle events on the item's topic:
//!
//! `StatusUpdate(processing)` → `Started` → progress `StatusUpdate`s →
//! `Completed` | `Failed`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::media::{topic, EventKind, MediaItem, MediaStatus, MediaStore, ProcessingEvent};
use crate::metrics::{PIPELINE_RUNS, PIPELINE_STAGE_FAILURES};
use crate::renditions::{RenditionPlanner, MANIFEST_NAME};
use crate::storage::BlobStore;

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, Stage, StageFailure};

const STARTED_MESSAGE: &str = "Video processing started";
const COMPLETED_MESSAGE: &str = "Video processing completed successfully";

/// Progress reported once the raw upload is local.
const PROGRESS_DOWNLOADED: u8 = 10;
/// Progress share covered by rendition encoding.
const PROGRESS_TRANSCODE_SPAN: u8 = 80;

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks an item as in flight until dropped.
struct InFlightClaim {
    set: InFlight,
    id: String,
}

impl InFlightClaim {
    fn acquire(set: &InFlight, id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
        inserted.then(|| Self {
            set: Arc::clone(set),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Collaborators shared by every pipeline run.
struct PipelineContext {
    config: OrchestratorConfig,
    store: Arc<dyn MediaStore>,
    blobs: Arc<dyn BlobStore>,
    planner: Arc<RenditionPlanner>,
    broker: Arc<Broker<ProcessingEvent>>,
    permits: Option<Arc<Semaphore>>,
}

/// Starts and tracks processing runs.
pub struct ProcessingOrchestrator {
    ctx: Arc<PipelineContext>,
    in_flight: InFlight,
}

impl ProcessingOrchestrator {
    /// Create a new orchestrator.
    ///
    /// The planner's work directory should be `config.processed_dir()`.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn MediaStore>,
        blobs: Arc<dyn BlobStore>,
        planner: Arc<RenditionPlanner>,
        broker: Arc<Broker<ProcessingEvent>>,
    ) -> Self {
        let permits = (config.max_concurrent_jobs > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent_jobs)));

        Self {
            ctx: Arc::new(PipelineContext {
                config,
                store,
                blobs,
                planner,
                broker,
                permits,
            }),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Broker lifecycle events are published to.
    pub fn broker(&self) -> &Arc<Broker<ProcessingEvent>> {
        &self.ctx.broker
    }

    /// Whether a run for `item_id` is in flight.
    pub fn is_processing(&self, item_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item_id)
    }

    /// Number of runs in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Begin processing `item_id`.
    ///
    /// Resolves the item, marks it `Processing`, publishes the initial status
    /// update and returns. The rest of the pipeline runs on a detached task
    /// that ends with exactly one `Completed` or `Failed` event.
    pub async fn start_processing(&self, item_id: &str) -> Result<(), OrchestratorError> {
        let item = self
            .ctx
            .store
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(item_id.to_string()))?;

        if item.status != MediaStatus::PendingUpload {
            return Err(OrchestratorError::InvalidState {
                id: item.id,
                status: item.status,
            });
        }

        let claim = InFlightClaim::acquire(&self.in_flight, &item.id)
            .ok_or_else(|| OrchestratorError::AlreadyProcessing(item.id.clone()))?;

        let item = self
            .ctx
            .store
            .update_status(&item.id, MediaStatus::Processing, Utc::now())
            .await?;

        self.ctx.publish(
            ProcessingEvent::new(&item.id, EventKind::StatusUpdate, MediaStatus::Processing)
                .with_message(STARTED_MESSAGE),
        );
        info!(item_id = %item.id, "Processing accepted");

        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            let _claim = claim;
            ctx.run(item).await;
        });

        Ok(())
    }
}

impl PipelineContext {
    fn publish(&self, event: ProcessingEvent) {
        let topic = topic(&event.item_id);
        let kind = event.event_type;
        let delivered = self.broker.publish(&topic, event);
        debug!(topic = %topic, event = ?kind, delivered, "Published processing event");
    }

    async fn run(&self, item: MediaItem) {
        let _permit = match &self.permits {
            Some(permits) => Arc::clone(permits).acquire_owned().await.ok(),
            None => None,
        };

        self.publish(
            ProcessingEvent::new(&item.id, EventKind::Started, MediaStatus::Processing)
                .with_message(STARTED_MESSAGE),
        );
        info!(item_id = %item.id, "Processing started");

        let raw_path = self.config.raw_dir().join(format!("{}.mp4", item.id));
        let output_dir = self.planner.output_dir_for(&raw_path).ok();

        let result = self.execute(&item, &raw_path).await;

        if let Err(failure) = &result {
            // Record is Error before Failed is published.
            if let Err(e) = self
                .store
                .update_status(&item.id, MediaStatus::Error, Utc::now())
                .await
            {
                warn!(item_id = %item.id, error = %e, "Failed to persist error status");
            }
            PIPELINE_STAGE_FAILURES
                .with_label_values(&[failure.stage.metric_label()])
                .inc();
            error!(
                item_id = %item.id,
                stage = %failure.stage,
                error = %failure.error,
                "Processing failed"
            );
        }

        self.cleanup(&item.id, &raw_path, output_dir.as_deref()).await;

        match result {
            Ok(()) => {
                PIPELINE_RUNS.with_label_values(&["ready"]).inc();
                info!(item_id = %item.id, "Processing completed");
                self.publish(
                    ProcessingEvent::new(&item.id, EventKind::Completed, MediaStatus::Ready)
                        .with_message(COMPLETED_MESSAGE)
                        .with_progress(100),
                );
            }
            Err(failure) => {
                PIPELINE_RUNS.with_label_values(&["error"]).inc();
                self.publish(
                    ProcessingEvent::new(&item.id, EventKind::Failed, MediaStatus::Error)
                        .with_message(failure.message())
                        .with_error(failure.error),
                );
            }
        }
    }

    async fn execute(&self, item: &MediaItem, raw_path: &Path) -> Result<(), StageFailure> {
        for dir in [self.config.raw_dir(), self.planner.config().work_dir.clone()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StageFailure::new(Stage::DirectoryCreation, e))?;
        }

        self.blobs
            .download(&item.source_key, raw_path)
            .await
            .map_err(|e| StageFailure::new(Stage::Download, e))?;
        debug!(item_id = %item.id, key = %item.source_key, "Raw upload downloaded");

        self.publish(
            ProcessingEvent::new(&item.id, EventKind::StatusUpdate, MediaStatus::Processing)
                .with_message("Video downloaded")
                .with_progress(PROGRESS_DOWNLOADED),
        );

        let output_dir = self
            .planner
            .transcode_with_progress(raw_path, |progress| {
                let pct = PROGRESS_DOWNLOADED
                    + (u16::from(progress.percent()) * u16::from(PROGRESS_TRANSCODE_SPAN) / 100)
                        as u8;
                self.publish(
                    ProcessingEvent::new(&item.id, EventKind::StatusUpdate, MediaStatus::Processing)
                        .with_message(format!(
                            "Rendition {} ready ({}/{})",
                            progress.variant, progress.completed, progress.total
                        ))
                        .with_progress(pct),
                );
            })
            .await
            .map_err(|e| StageFailure::new(Stage::Transcoding, e))?;

        let files = list_output_files(&output_dir)
            .await
            .map_err(|e| StageFailure::new(Stage::ReadingOutput, e))?;

        for (name, path) in &files {
            let key = format!("{}/{}", item.output_prefix, name);
            self.blobs
                .upload(&key, path)
                .await
                .map_err(|e| StageFailure::new(Stage::Upload, e))?;
        }
        info!(item_id = %item.id, files = files.len(), "Renditions uploaded");

        self.store
            .update_status(&item.id, MediaStatus::Ready, Utc::now())
            .await
            .map_err(|e| StageFailure::new(Stage::DatabaseUpdate, e))?;

        Ok(())
    }

    async fn cleanup(&self, item_id: &str, raw_path: &Path, output_dir: Option<&Path>) {
        if let Err(e) = self.blobs.cleanup(raw_path).await {
            warn!(item_id, path = %raw_path.display(), error = %e, "Failed to remove raw scratch file");
        }
        if let Some(dir) = output_dir {
            if let Err(e) = self.blobs.cleanup(dir).await {
                warn!(item_id, path = %dir.display(), error = %e, "Failed to remove rendition output");
            }
        }
    }
}

/// Regular files in `dir`, sorted by name with the manifest last.
async fn list_output_files(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    files.sort_by(|(a, _), (b, _)| {
        (a == MANIFEST_NAME, a.as_str()).cmp(&(b == MANIFEST_NAME, b.as_str()))
    });
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renditions::RenditionConfig;
    use crate::testing::{fixtures, MockBlobStore, MockEncoder, MockMediaStore};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        store: Arc<MockMediaStore>,
        blobs: Arc<MockBlobStore>,
        broker: Arc<Broker<ProcessingEvent>>,
        orchestrator: ProcessingOrchestrator,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let config = OrchestratorConfig::new(dir.path());
        let store = Arc::new(MockMediaStore::new());
        let blobs = Arc::new(MockBlobStore::new());
        let broker = Arc::new(Broker::default());
        let planner = Arc::new(RenditionPlanner::new(
            Arc::new(MockEncoder::new()),
            RenditionConfig::new(config.processed_dir()),
        ));
        let orchestrator = ProcessingOrchestrator::new(
            config,
            store.clone(),
            blobs.clone(),
            planner,
            broker.clone(),
        );
        Harness {
            _dir: dir,
            store,
            blobs,
            broker,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found_and_silent() {
        let h = harness();
        let mut sub = h.broker.subscribe(&topic("ghost")).unwrap();

        let err = h.orchestrator.start_processing("ghost").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound(_)));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_rejects_items_not_pending_upload() {
        let h = harness();
        h.store
            .insert(fixtures::item_with_status("v1", MediaStatus::Ready))
            .await;

        let err = h.orchestrator.start_processing("v1").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidState {
                status: MediaStatus::Ready,
                ..
            }
        ));
        assert!(h.store.status_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_accepts_and_publishes_initial_status() {
        let h = harness();
        h.store.insert(fixtures::pending_item("v1")).await;
        h.blobs.put_object("raw-videos/v1.mp4", b"raw".to_vec()).await;
        let mut sub = h.broker.subscribe(&topic("v1")).unwrap();

        h.orchestrator.start_processing("v1").await.unwrap();

        let first = sub.try_recv().expect("status update published before return");
        assert_eq!(first.event_type, EventKind::StatusUpdate);
        assert_eq!(first.status, MediaStatus::Processing);
        assert_eq!(first.message.as_deref(), Some(STARTED_MESSAGE));
        assert_eq!(
            h.store.get("v1").await.unwrap().status,
            MediaStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_claim_is_released_on_drop() {
        let set: InFlight = Arc::new(Mutex::new(HashSet::new()));
        let claim = InFlightClaim::acquire(&set, "v1").unwrap();
        assert!(InFlightClaim::acquire(&set, "v1").is_none());
        drop(claim);
        assert!(InFlightClaim::acquire(&set, "v1").is_some());
    }

    #[tokio::test]
    async fn test_output_files_list_manifest_last() {
        let dir = TempDir::new().unwrap();
        for name in ["playlist.m3u8", "720p.m3u8", "480p_000.ts", "480p.m3u8"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();

        let names: Vec<String> = list_output_files(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            names,
            vec!["480p.m3u8", "480p_000.ts", "720p.m3u8", "playlist.m3u8"]
        );
    }
}
