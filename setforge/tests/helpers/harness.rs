//! Test application builder and HTTP helpers

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use setforge::analysis::AnalysisEngine;
use setforge::config::ServiceConfig;
use setforge::services::{FsTrackStore, TrackStore};
use setforge::{build_router, AppState};
use setforge_common::events::EventBus;

/// Service wired around a temporary root folder
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub config: ServiceConfig,
    _root: TempDir,
}

impl TestApp {
    pub fn new(engine: Arc<dyn AnalysisEngine>) -> Self {
        Self::build(engine, |_| {}, |dir| -> Arc<dyn TrackStore> {
            Arc::new(FsTrackStore::new(dir))
        })
    }

    pub fn with_config(
        engine: Arc<dyn AnalysisEngine>,
        configure: impl FnOnce(&mut ServiceConfig),
    ) -> Self {
        Self::build(engine, configure, |dir| -> Arc<dyn TrackStore> {
            Arc::new(FsTrackStore::new(dir))
        })
    }

    pub fn with_store(
        engine: Arc<dyn AnalysisEngine>,
        store: impl FnOnce(PathBuf) -> Arc<dyn TrackStore>,
    ) -> Self {
        Self::build(engine, |_| {}, store)
    }

    fn build(
        engine: Arc<dyn AnalysisEngine>,
        configure: impl FnOnce(&mut ServiceConfig),
        store: impl FnOnce(PathBuf) -> Arc<dyn TrackStore>,
    ) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = ServiceConfig::with_root(root.path());
        config.analysis_workers = 2;
        configure(&mut config);

        let layout = config.layout();
        layout
            .ensure_directory_exists()
            .expect("Failed to create root layout");

        let state = AppState::new(
            &config,
            store(layout.sessions_dir()),
            engine,
            EventBus::new(256),
        );
        let router = build_router(state.clone());

        Self {
            state,
            router,
            config,
            _root: root,
        }
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.config.layout().sessions_dir()
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.config.layout().exports_dir()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router call failed")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        read_json(response).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        read_json(response).await
    }

    /// POST /sessions, returning the new id
    pub async fn create_session(&self) -> String {
        let (status, json) = self.post("/sessions").await;
        assert_eq!(status, StatusCode::OK);
        json["session_id"]
            .as_str()
            .expect("session_id missing")
            .to_string()
    }

    /// POST /upload/{id} with files in the "folder" field
    pub async fn upload(
        &self,
        session_id: &str,
        files: &[(&str, Vec<u8>)],
    ) -> (StatusCode, serde_json::Value) {
        let (content_type, body) = multipart_body("folder", files);
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(format!("/upload/{}", session_id))
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        read_json(response).await
    }
}

/// Encode files as a multipart/form-data body under one field name
pub fn multipart_body(field: &str, files: &[(&str, Vec<u8>)]) -> (String, Vec<u8>) {
    let boundary = "setforge-test-boundary";
    let mut body = Vec::new();

    for (filename, content) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Status and JSON body of a response
pub async fn read_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
