use std::sync::Arc;
use std::time::Duration;

use vodpipe_core::{
    Broker, Config, FsBlobStore, MediaStore, ProcessingEvent, ProcessingOrchestrator,
    SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn MediaStore>,
    blobs: Arc<FsBlobStore>,
    orchestrator: Arc<ProcessingOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MediaStore>,
        blobs: Arc<FsBlobStore>,
        orchestrator: Arc<ProcessingOrchestrator>,
    ) -> Self {
        Self {
            config,
            store,
            blobs,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn MediaStore {
        self.store.as_ref()
    }

    pub fn blobs(&self) -> &FsBlobStore {
        self.blobs.as_ref()
    }

    pub fn orchestrator(&self) -> &ProcessingOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn broker(&self) -> &Arc<Broker<ProcessingEvent>> {
        self.orchestrator.broker()
    }

    pub fn upload_url_ttl(&self) -> Duration {
        Duration::from_secs(self.config.storage.upload_url_ttl_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.server.max_upload_bytes
    }

    pub fn sse_keepalive(&self) -> Duration {
        Duration::from_secs(self.config.server.sse_keepalive_secs)
    }
}
