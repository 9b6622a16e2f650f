pub mod broker;
pub mod config;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod renditions;
pub mod storage;
pub mod testing;

pub use broker::{Broker, BrokerError, Subscriber};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use media::{
    topic, CreateMediaRequest, EventKind, MediaError, MediaFilter, MediaItem, MediaStatus,
    MediaStore, ProcessingEvent, SqliteMediaStore, Visibility,
};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, ProcessingOrchestrator, Stage};
pub use renditions::{
    Encoder, EncoderConfig, EncoderError, FfmpegEncoder, RenditionConfig, RenditionError,
    RenditionPlanner, Variant,
};
pub use storage::{BlobStore, FsBlobStore, StorageConfig, StorageError};
