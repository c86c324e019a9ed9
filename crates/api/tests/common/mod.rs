#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use folio_api::config::ServerConfig;
use folio_api::router::build_app_router;
use folio_api::state::AppState;

/// A full application over a private temp directory.
///
/// Worker scripts are bash scripts and `bash` is the interpreter, so no
/// Python is needed. Scripts default to exiting immediately; tests replace
/// them with [`TestApp::write_script`] before calling the route.
pub struct TestApp {
    pub dir: TempDir,
    pub config: ServerConfig,
    pub state: AppState,
    pub app: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_interpreter("bash")
    }

    pub fn with_interpreter(program: &str) -> Self {
        Self::build(program, |_| {})
    }

    /// Default app with `adjust` applied to its config before startup.
    pub fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        Self::build("bash", adjust)
    }

    fn build(program: &str, adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(dir.path(), program);
        adjust(&mut config);

        for script in [&config.report_script, &config.outline_script, &config.podcast_script] {
            std::fs::write(script, "exit 0\n").expect("write default script");
        }
        std::fs::create_dir_all(&config.model_dir).expect("model dir");

        let state = AppState::from_config(config.clone());
        let app = build_app_router(state.clone(), &config);

        Self {
            dir,
            config,
            state,
            app,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_script(&self, script: &Path, body: &str) {
        std::fs::write(script, body).expect("write script");
    }

    /// Write `contents` at `rel` under `base`, creating parents.
    pub fn write_file(&self, base: &Path, rel: &str, contents: &[u8]) -> PathBuf {
        let path = base.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("request")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_range(&self, uri: &str, range: &str) -> Response<Body> {
        self.request(
            Request::get(uri)
                .header("range", range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(&self, uri: &str, form: MultipartForm) -> Response<Body> {
        let (content_type, body) = form.finish();
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

/// Build a test `ServerConfig` rooted at `root`.
pub fn test_config(root: &Path, interpreter: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 10 * 1024 * 1024,
        public_dir: root.join("public"),
        staging_dir: root.join("staging"),
        python_path: interpreter.to_string(),
        report_script: root.join("report_worker.sh"),
        outline_script: root.join("outline_worker.sh"),
        podcast_script: root.join("podcast_worker.sh"),
        model_dir: root.join("models"),
        script_timeout_secs: 10,
        termination_grace_ms: 500,
    }
}

/// Minimal `multipart/form-data` body builder.
pub struct MultipartForm {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "folio-test-boundary-7d3f",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// A worker output file in the shape the report worker writes.
pub fn report_json(source: &str) -> String {
    serde_json::json!({
        "metadata": { "source_file": source, "query": "tidal energy" },
        "extracted_sections": [{
            "document": source,
            "section_title": "Overview",
            "importance_rank": 1,
            "page_number": 2
        }],
        "subsection_analysis": [{
            "document": source,
            "refined_text": "Tidal turbines convert the kinetic energy of currents.",
            "page_number": 2
        }]
    })
    .to_string()
}
