use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::broker::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::orchestrator::OrchestratorConfig;
use crate::renditions::{EncoderConfig, Variant};
use crate::storage::StorageConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub processing: OrchestratorConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Rendition ladder, in manifest order.
    #[serde(default = "Variant::default_ladder")]
    pub renditions: Vec<Variant>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            encoder: EncoderConfig::default(),
            processing: OrchestratorConfig::default(),
            broker: BrokerConfig::default(),
            renditions: Variant::default_ladder(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval between keep-alive comments on event streams.
    #[serde(default = "default_keepalive")]
    pub sse_keepalive_secs: u64,
    /// Largest accepted blob upload body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sse_keepalive_secs: default_keepalive(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024 * 1024
}

fn default_keepalive() -> u64 {
    30
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vodpipe.db")
}

/// Notification broker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Messages buffered per subscriber before deliveries are dropped.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: default_subscriber_capacity(),
        }
    }
}

fn default_subscriber_capacity() -> usize {
    DEFAULT_SUBSCRIBER_CAPACITY
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: SanitizedStorageConfig,
    pub encoder: EncoderConfig,
    pub processing: OrchestratorConfig,
    pub broker: BrokerConfig,
    pub renditions: Vec<Variant>,
}

/// Sanitized storage config (signing secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
    pub signing_secret_configured: bool,
    pub upload_url_ttl_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: SanitizedStorageConfig {
                root: config.storage.root.clone(),
                public_base_url: config.storage.public_base_url.clone(),
                signing_secret_configured: !config.storage.signing_secret.is_empty(),
                upload_url_ttl_secs: config.storage.upload_url_ttl_secs,
            },
            encoder: config.encoder.clone(),
            processing: config.processing.clone(),
            broker: config.broker.clone(),
            renditions: config.renditions.clone(),
        }
    }
}
