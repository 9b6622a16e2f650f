//! Common test utilities for driving the router in-process.
//!
//! The fixture wires a real SQLite store and filesystem blob store under a
//! temporary directory, with a [`MockEncoder`] standing in for ffmpeg, so the
//! whole upload → process → playback flow runs without external tools.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vodpipe_core::{
    testing::MockEncoder, BlobStore, Broker, Config, FsBlobStore, MediaStore,
    OrchestratorConfig, ProcessingOrchestrator, RenditionConfig, RenditionPlanner,
    SqliteMediaStore,
};
use vodpipe_server::{api::create_router, state::AppState};

pub const TEST_SECRET: &str = "test-signing-secret";
pub const TEST_BASE_URL: &str = "http://vodpipe.test";

/// In-process server with a controllable encoder.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.post("/api/v1/media", json!({ "title": "Clip" })).await;
///     assert_eq!(response.status, StatusCode::CREATED);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub encoder: Arc<MockEncoder>,
    pub store: Arc<SqliteMediaStore>,
    pub blobs: Arc<FsBlobStore>,
    pub orchestrator: Arc<ProcessingOrchestrator>,
    /// Holds the database, blob root and scratch space
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("test.db");
        config.storage.root = temp_dir.path().join("blobs");
        config.storage.public_base_url = TEST_BASE_URL.to_string();
        config.storage.signing_secret = TEST_SECRET.to_string();
        config.processing = OrchestratorConfig::new(temp_dir.path().join("scratch"));

        let store = Arc::new(
            SqliteMediaStore::new(&config.database.path).expect("Failed to create media store"),
        );
        let blobs = Arc::new(FsBlobStore::from_config(&config.storage));
        let encoder = Arc::new(MockEncoder::new());

        let planner = Arc::new(RenditionPlanner::new(
            Arc::clone(&encoder) as Arc<dyn vodpipe_core::Encoder>,
            RenditionConfig::new(config.processing.processed_dir())
                .with_variants(config.renditions.clone()),
        ));
        let broker = Arc::new(Broker::new(config.broker.subscriber_capacity));

        let orchestrator = Arc::new(ProcessingOrchestrator::new(
            config.processing.clone(),
            Arc::clone(&store) as Arc<dyn MediaStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            planner,
            broker,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn MediaStore>,
            Arc::clone(&blobs),
            Arc::clone(&orchestrator),
        ));

        Self {
            router: create_router(state),
            encoder,
            store,
            blobs,
            orchestrator,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// PUT raw bytes, as a client following a signed upload URL would.
    pub async fn put_bytes(&self, path: &str, bytes: &[u8]) -> TestResponse {
        let request = Request::builder()
            .method("PUT")
            .uri(path)
            .header("Content-Type", "video/mp4")
            .body(Body::from(bytes.to_vec()))
            .unwrap();
        self.send(request).await
    }

    /// Create a media item and return `(id, upload path)`.
    pub async fn create_media(&self, title: &str) -> (String, String) {
        let response = self
            .post("/api/v1/media", serde_json::json!({ "title": title }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        let id = response.body["media"]["id"]
            .as_str()
            .expect("media id")
            .to_string();
        let upload_url = response.body["upload_url"].as_str().expect("upload_url");
        (id, upload_path(upload_url))
    }

    /// Create a media item and upload its source video.
    pub async fn create_uploaded_media(&self, title: &str) -> String {
        let (id, upload_path) = self.create_media(title).await;
        let response = self.put_bytes(&upload_path, b"fake mp4 bytes").await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        id
    }

    /// Poll the item until it leaves `processing`.
    pub async fn wait_for_terminal_status(&self, id: &str) -> String {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(&format!("/api/v1/media/{}", id)).await;
            let status = response.body["status"].as_str().unwrap_or_default().to_string();
            if status == "ready" || status == "error" {
                return status;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "media {} stuck in status {}",
                id,
                status
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}

/// Strip the public base URL from a signed URL, leaving the router path.
pub fn upload_path(url: &str) -> String {
    url.strip_prefix(TEST_BASE_URL)
        .unwrap_or_else(|| panic!("unexpected upload url {}", url))
        .to_string()
}
