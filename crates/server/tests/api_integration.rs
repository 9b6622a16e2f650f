//! HTTP-level tests for the media, blob and metrics endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{upload_path, TestFixture};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_redacts_signing_secret() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = response.body.to_string();
    assert!(!text.contains(common::TEST_SECRET));
    assert_eq!(response.body["storage"]["signing_secret_configured"], true);
}

#[tokio::test]
async fn test_create_media_returns_signed_upload_url() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post(
            "/api/v1/media",
            json!({ "title": "  Launch day  ", "description": "Keynote", "visibility": "unlisted" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let media = &response.body["media"];
    assert_eq!(media["title"], "Launch day");
    assert_eq!(media["description"], "Keynote");
    assert_eq!(media["visibility"], "unlisted");
    assert_eq!(media["status"], "pending_upload");

    let id = media["id"].as_str().unwrap();
    let upload_url = response.body["upload_url"].as_str().unwrap();
    assert!(upload_url.starts_with(&format!(
        "{}/api/v1/blobs/raw-videos/{}.mp4?expires=",
        common::TEST_BASE_URL,
        id
    )));
    assert!(upload_url.contains("&sig="));
}

#[tokio::test]
async fn test_create_media_rejects_invalid_title() {
    let fixture = TestFixture::new().await;

    let empty = fixture.post("/api/v1/media", json!({ "title": "   " })).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert!(empty.body["error"].as_str().unwrap().contains("title"));

    let long = fixture
        .post("/api/v1/media", json!({ "title": "x".repeat(201) }))
        .await;
    assert_eq!(long.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_media_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/media/does-not-exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("does-not-exist"));
}

#[tokio::test]
async fn test_list_media_with_status_filter() {
    let fixture = TestFixture::new().await;
    fixture.create_media("one").await;
    fixture.create_media("two").await;

    let all = fixture.get("/api/v1/media").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["total"], 2);
    assert_eq!(all.body["media"].as_array().unwrap().len(), 2);

    let pending = fixture.get("/api/v1/media?status=pending_upload&limit=1").await;
    assert_eq!(pending.body["total"], 2);
    assert_eq!(pending.body["media"].as_array().unwrap().len(), 1);

    let ready = fixture.get("/api/v1/media?status=ready").await;
    assert_eq!(ready.body["total"], 0);

    let bad = fixture.get("/api/v1/media?status=bogus").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_upload_writes_blob() {
    let fixture = TestFixture::new().await;
    let (id, path) = fixture.create_media("clip").await;

    let response = fixture.put_bytes(&path, b"raw video").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["size"], 9);

    let stored = fixture
        .temp_dir
        .path()
        .join("blobs/raw-videos")
        .join(format!("{}.mp4", id));
    assert_eq!(std::fs::read(stored).unwrap(), b"raw video");
}

#[tokio::test]
async fn test_upload_with_bad_signature_is_unauthorized() {
    let fixture = TestFixture::new().await;
    let (id, path) = fixture.create_media("clip").await;

    let (base, _) = path.split_once("&sig=").unwrap();
    let tampered = format!("{}&sig=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", base);
    let response = fixture.put_bytes(&tampered, b"raw").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Signature for one key does not authorize another.
    let other = path.replace(&id, "someone-else");
    let response = fixture.put_bytes(&other, b"raw").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_with_expired_url_is_unauthorized() {
    let fixture = TestFixture::new().await;
    let url = fixture.blobs.signed_upload_url("raw-videos/x.mp4", 1).unwrap();

    let response = fixture.put_bytes(&upload_path(&url), b"raw").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_process_unknown_media_is_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_empty("/api/v1/media/missing/process").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_process_runs_pipeline_to_ready() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_uploaded_media("clip").await;

    let response = fixture
        .post_empty(&format!("/api/v1/media/{}/process", id))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["status"], "processing");

    assert_eq!(fixture.wait_for_terminal_status(&id).await, "ready");
    assert_eq!(fixture.encoder.call_count().await, 2);

    let manifest = fixture
        .get(&format!("/api/v1/blobs/processed-videos/{}/playlist.m3u8", id))
        .await;
    assert_eq!(manifest.status, StatusCode::OK);
    let text = manifest.body.as_str().unwrap();
    assert!(text.starts_with("#EXTM3U"));
    assert!(text.contains("#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720\n720p.m3u8"));
    assert!(text.contains("#EXT-X-STREAM-INF:BANDWIDTH=1400000,RESOLUTION=854x480\n480p.m3u8"));

    let segment = fixture
        .get(&format!("/api/v1/blobs/processed-videos/{}/720p_000.ts", id))
        .await;
    assert_eq!(segment.status, StatusCode::OK);
}

#[tokio::test]
async fn test_process_twice_conflicts() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_uploaded_media("clip").await;

    let first = fixture
        .post_empty(&format!("/api/v1/media/{}/process", id))
        .await;
    assert_eq!(first.status, StatusCode::ACCEPTED);

    let second = fixture
        .post_empty(&format!("/api/v1/media/{}/process", id))
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    fixture.wait_for_terminal_status(&id).await;
}

#[tokio::test]
async fn test_process_without_upload_ends_in_error() {
    let fixture = TestFixture::new().await;
    let (id, _) = fixture.create_media("never uploaded").await;

    let response = fixture
        .post_empty(&format!("/api/v1/media/{}/process", id))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    assert_eq!(fixture.wait_for_terminal_status(&id).await, "error");
    assert_eq!(fixture.encoder.call_count().await, 0);
}

#[tokio::test]
async fn test_raw_uploads_are_not_served() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_uploaded_media("clip").await;

    let response = fixture
        .get(&format!("/api/v1/blobs/raw-videos/{}.mp4", id))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/api/v1/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    let text = response.body.as_str().unwrap();
    assert!(text.contains("vodpipe_http_requests_total"));
    assert!(text.contains("vodpipe_media_by_status"));
    assert!(text.contains("vodpipe_broker_active_subscribers"));
}
