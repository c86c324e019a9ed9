//! Integration tests for outline and podcast script endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, MultipartForm, TestApp};

#[tokio::test]
async fn stored_outline_is_returned() {
    let t = TestApp::new();
    t.write_file(
        &t.config.outlines_dir(),
        "guide.json",
        br#"{"title":"Field Guide","outline":[]}"#,
    );

    let response = t.get("/api/v1/outlines/guide.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["title"], "Field Guide");
}

#[tokio::test]
async fn outline_name_checks() {
    let t = TestApp::new();

    let response = t.get("/api/v1/outlines/..guide.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.get("/api/v1/outlines/%2E%2E%2Fsecret.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.get("/api/v1/outlines/guide.txt").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.get("/api/v1/outlines/absent.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploading_a_document_runs_the_outline_script() {
    let t = TestApp::new();
    // Invoked as: --input <file> --output <dir>
    t.write_script(
        &t.config.outline_script,
        r#"name=$(basename "$2" .pdf)
printf '{"title":"%s","outline":[{"level":"H1","text":"Intro","page":0}]}' "$name" > "$4/$name.json"
echo "SAVED_JSON::$4/$name.json"
"#,
    );

    let form = MultipartForm::new().file("file", "Lake Ecology.pdf", b"%PDF-1.7");
    let response = t.post_multipart("/api/v1/outlines", form).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["file_name"], "Lake_Ecology.json");
    assert_eq!(json["data"]["url"], "/api/v1/outlines/Lake_Ecology.json");
    assert_eq!(json["data"]["outline"]["title"], "Lake_Ecology");

    let stored = t.get("/api/v1/outlines/Lake_Ecology.json").await;
    assert_eq!(stored.status(), StatusCode::OK);
}

#[tokio::test]
async fn outline_upload_without_file_is_400() {
    let t = TestApp::new();
    let form = MultipartForm::new().text("name", "doc.pdf");
    let response = t.post_multipart("/api/v1/outlines", form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failing_outline_script_surfaces_stderr() {
    let t = TestApp::new();
    t.write_script(&t.config.outline_script, "echo 'cannot parse pdf' >&2\nexit 1\n");

    let form = MultipartForm::new().file("file", "broken.pdf", b"junk");
    let response = t.post_multipart("/api/v1/outlines", form).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "script_failed");
    assert!(json["stderr"].as_str().unwrap().contains("cannot parse pdf"));
}

#[tokio::test]
async fn podcast_returns_last_stdout_line() {
    let t = TestApp::new();
    t.write_script(
        &t.config.podcast_script,
        r#"text=$(cat)
echo "narrating: $text" >&2
echo "/audio/podcast_1.mp3"
"#,
    );

    let response = t
        .post_json("/api/v1/podcasts", serde_json::json!({ "text": "Coral reefs" }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["audio_url"], "/audio/podcast_1.mp3");
}

#[tokio::test]
async fn podcast_may_outlast_the_request_timeout() {
    let t = TestApp::with_config(|config| {
        config.request_timeout_secs = 1;
        config.script_timeout_secs = 10;
    });
    t.write_script(
        &t.config.podcast_script,
        "cat > /dev/null\nsleep 2\necho /audio/slow.mp3\n",
    );

    let response = t
        .post_json("/api/v1/podcasts", serde_json::json!({ "text": "Glaciers" }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["audio_url"], "/audio/slow.mp3");
}

#[tokio::test]
async fn empty_podcast_text_is_400() {
    let t = TestApp::new();
    let response = t
        .post_json("/api/v1/podcasts", serde_json::json!({ "text": "   " }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.post_json("/api/v1/podcasts", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
