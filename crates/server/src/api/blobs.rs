//! Blob endpoints: signed uploads and playback of processed output.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::info;
use vodpipe_core::storage::validate_key;

use super::error::ApiError;
use crate::state::AppState;

/// Only processed output is served back to clients.
pub const PLAYBACK_PREFIX: &str = "processed-videos/";

/// Query parameters carried by a signed upload URL
#[derive(Debug, Deserialize)]
pub struct SignedParams {
    pub expires: u64,
    pub sig: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub size: u64,
}

/// Store the request body under `key` if the signature checks out.
pub async fn upload_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<SignedParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    state
        .blobs()
        .verify_upload(&key, params.expires, &params.sig)?;

    let size = state.blobs().write_object(&key, &body).await?;
    info!(key = %key, size, "Blob uploaded");

    Ok((StatusCode::CREATED, Json(UploadResponse { key, size })))
}

/// Serve a processed rendition file (manifest, playlist or segment).
pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    if !key.starts_with(PLAYBACK_PREFIX) {
        return Err(ApiError::NotFound(format!("Blob not found: {}", key)));
    }
    validate_key(&key)?;

    // Keys are restricted to URL-safe characters, so the path needs no escaping.
    let uri: Uri = format!("/{}", key)
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid blob key: {}", key)))?;

    let (mut parts, _) = request.into_parts();
    parts.uri = uri;
    let request = Request::from_parts(parts, Body::empty());

    let response = ServeDir::new(state.blobs().root())
        .oneshot(request)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(response.map(Body::new).into_response())
}
