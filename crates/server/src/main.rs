use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vodpipe_core::{
    load_config, validate_config, BlobStore, Broker, Encoder, FfmpegEncoder, FsBlobStore,
    MediaStore, ProcessingEvent, ProcessingOrchestrator, RenditionConfig, RenditionPlanner,
    SqliteMediaStore,
};
use vodpipe_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vodpipe {}", VERSION);

    // Determine config path
    let config_path = std::env::var("VODPIPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Blob root: {:?}", config.storage.root);

    // Media records
    let store: Arc<dyn MediaStore> = Arc::new(
        SqliteMediaStore::new(&config.database.path).context("Failed to create media store")?,
    );
    info!("Media store initialized");

    // Blob storage (filesystem backed, signed uploads)
    let blobs = Arc::new(FsBlobStore::from_config(&config.storage));
    tokio::fs::create_dir_all(blobs.root())
        .await
        .with_context(|| format!("Failed to create blob root {:?}", blobs.root()))?;

    // Encoder
    let encoder = FfmpegEncoder::new(config.encoder.clone());
    match encoder.validate().await {
        Ok(()) => info!("Encoder '{}' available", encoder.name()),
        Err(e) => error!("Encoder check failed, processing will fail: {}", e),
    }

    let rendition_config = RenditionConfig::new(config.processing.processed_dir())
        .with_variants(config.renditions.clone())
        .with_preset(config.encoder.preset.clone())
        .with_log_level(config.encoder.log_level.clone());
    let planner = Arc::new(RenditionPlanner::new(Arc::new(encoder), rendition_config));
    info!(
        "Rendition ladder: {}",
        config
            .renditions
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Notification broker
    let broker: Arc<Broker<ProcessingEvent>> =
        Arc::new(Broker::new(config.broker.subscriber_capacity));

    let orchestrator = Arc::new(ProcessingOrchestrator::new(
        config.processing.clone(),
        Arc::clone(&store),
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        planner,
        Arc::clone(&broker),
    ));
    info!(
        "Processing orchestrator ready (scratch dir: {:?})",
        config.processing.scratch_dir
    );

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), store, blobs, orchestrator));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Closing the broker ends open event streams so graceful shutdown can finish.
    let shutdown_broker = Arc::clone(&broker);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Closing notification broker...");
            shutdown_broker.close();
        })
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
