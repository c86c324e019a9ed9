//! Integration tests for incremental report polling.

mod common;

use axum::http::StatusCode;
use common::{body_json, report_json, TestApp};

#[tokio::test]
async fn missing_output_dir_yields_empty_delta() {
    let t = TestApp::new();
    let response = t.get("/api/v1/reports").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["new_reports"], serde_json::json!([]));
    assert_eq!(data["new_files"], serde_json::json!([]));
    assert_eq!(data["running"], false);
    assert!(data["run_id"].is_null());
    assert!(data["last_exit_code"].is_null());
}

#[tokio::test]
async fn returns_reports_not_in_known_set() {
    let t = TestApp::new();
    let reports = t.config.reports_dir();
    t.write_file(&reports, "a.json", report_json("a.pdf").as_bytes());
    t.write_file(&reports, "b.json", report_json("b.pdf").as_bytes());
    t.write_file(&reports, "notes.txt", b"not a report");

    let json = body_json(t.get("/api/v1/reports?known=a.json").await).await;
    let data = &json["data"];

    assert_eq!(data["new_files"], serde_json::json!(["b.json"]));
    assert_eq!(data["new_reports"][0]["source_file"], "b.pdf");
    assert_eq!(
        data["new_reports"][0]["sections"][0]["section_title"],
        "Overview"
    );
    assert_eq!(
        data["new_reports"][0]["sections"][0]["refined_text"],
        "Tidal turbines convert the kinetic energy of currents."
    );
}

#[tokio::test]
async fn polling_with_full_known_set_is_idempotent() {
    let t = TestApp::new();
    let reports = t.config.reports_dir();
    t.write_file(&reports, "a.json", report_json("a.pdf").as_bytes());
    t.write_file(&reports, "b.json", report_json("b.pdf").as_bytes());

    let first = body_json(t.get("/api/v1/reports?known=a.json,b.json").await).await;
    let second = body_json(t.get("/api/v1/reports?known=a.json,b.json").await).await;

    assert_eq!(first["data"]["new_files"], serde_json::json!([]));
    assert_eq!(first, second);
}

#[tokio::test]
async fn half_written_report_is_retried() {
    let t = TestApp::new();
    let reports = t.config.reports_dir();
    t.write_file(&reports, "a.json", b"{\"metadata\":");

    let json = body_json(t.get("/api/v1/reports").await).await;
    assert_eq!(json["data"]["new_files"], serde_json::json!([]));

    t.write_file(&reports, "a.json", report_json("a.pdf").as_bytes());
    let json = body_json(t.get("/api/v1/reports").await).await;
    assert_eq!(json["data"]["new_files"], serde_json::json!(["a.json"]));
}
