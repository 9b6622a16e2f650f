//! Media item API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vodpipe_core::{
    BlobStore, CreateMediaRequest, MediaFilter, MediaItem, MediaStatus, Visibility,
};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for media queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for media queries
const DEFAULT_LIMIT: i64 = 100;

/// Request body for creating a media item
#[derive(Debug, Deserialize)]
pub struct CreateMediaBody {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// Query parameters for listing media
#[derive(Debug, Deserialize)]
pub struct ListMediaParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for a newly created item: the record plus where to upload the source.
#[derive(Debug, Serialize)]
pub struct CreateMediaResponse {
    pub media: MediaItem,
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub struct ListMediaResponse {
    pub media: Vec<MediaItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct ProcessAcceptedResponse {
    pub id: String,
    pub status: MediaStatus,
}

/// Create a media item and hand back a signed upload URL for its source video.
pub async fn create_media(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMediaBody>,
) -> Result<(StatusCode, Json<CreateMediaResponse>), ApiError> {
    let mut request = CreateMediaRequest::new(body.title);
    if let Some(description) = body.description {
        request = request.with_description(description);
    }
    if let Some(visibility) = body.visibility {
        request = request.with_visibility(visibility);
    }

    let media = state.store().create(request).await?;
    let upload_url = state
        .blobs()
        .presigned_upload_url(&media.source_key, state.upload_url_ttl())
        .await?;

    info!(id = %media.id, title = %media.title, "Media item created");

    Ok((
        StatusCode::CREATED,
        Json(CreateMediaResponse { media, upload_url }),
    ))
}

pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MediaItem>, ApiError> {
    state
        .store()
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::media_not_found(&id))
}

/// List media items, newest first
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListMediaParams>,
) -> Result<Json<ListMediaResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = MediaFilter::new().with_limit(limit).with_offset(offset);
    if let Some(raw) = params.status.as_deref() {
        let status = MediaStatus::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", raw)))?;
        filter = filter.with_status(status);
    }

    let media = state.store().list(&filter).await?;
    let total = state.store().count(&filter).await?;

    Ok(Json(ListMediaResponse {
        media,
        total,
        limit,
        offset,
    }))
}

/// Kick off processing. The pipeline itself runs in the background.
pub async fn process_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ProcessAcceptedResponse>), ApiError> {
    state.orchestrator().start_processing(&id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessAcceptedResponse {
            id,
            status: MediaStatus::Processing,
        }),
    ))
}
