use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{blobs, events, handlers, media, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes());

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Media
        .route("/media", post(media::create_media).get(media::list_media))
        .route("/media/{id}", get(media::get_media))
        .route("/media/{id}/process", post(media::process_media))
        .route("/media/{id}/events", get(events::media_events))
        // Blobs
        .route(
            "/blobs/{*key}",
            get(blobs::get_blob)
                .put(blobs::upload_blob)
                .layer(upload_limit),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
