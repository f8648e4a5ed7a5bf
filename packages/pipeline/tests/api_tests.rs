mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use ftclaw_pipeline::api::{router, AppState};

use common::{linked, start, unlinked, wait_idle, FakeServices, Gate};

fn app(output_dir: &std::path::Path, static_dir: &std::path::Path, services: FakeServices) -> (Router, AppState) {
    app_with_target_dirs(output_dir, static_dir, services, false)
}

fn app_with_target_dirs(
    output_dir: &std::path::Path,
    static_dir: &std::path::Path,
    services: FakeServices,
    allow_pdf_target_dir: bool,
) -> (Router, AppState) {
    let state = AppState {
        coordinator: start(output_dir, services),
        output_dir: output_dir.to_path_buf(),
        allow_pdf_target_dir,
    };
    (router(state.clone(), static_dir), state)
}

fn services() -> FakeServices {
    FakeServices::default().with_listing(
        1,
        vec![
            linked("공정거래법", "독점규제 및 공정거래에 관한 법률", "https://a.example/1"),
            unlinked("공정거래법", "기업결합 심사기준"),
        ],
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method("POST").uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_idle_status() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let (status, body) = get_json(&app, "/api/scrape/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "phase": "idle",
            "is_running": false,
            "progress": 0,
            "total": 0,
            "current_label": "",
            "record_count": 0
        })
    );
}

#[tokio::test]
async fn test_scrape_then_results() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = app(tmp.path(), tmp.path(), services());

    let (status, body) = post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "스크래핑을 시작합니다.");

    wait_idle(&state.coordinator).await;

    let (status, body) = get_json(&app, "/api/scrape/results").await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "독점규제 및 공정거래에 관한 법률");
    assert_eq!(records[0]["effective_date"], "대기중");
    assert_eq!(records[1]["detail_link"], "N/A");
}

#[tokio::test]
async fn test_invalid_category_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let (status, body) =
        post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "15" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_enrich_without_dataset() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let (status, body) = post_json(&app, "/api/scrape/info", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "status": "error", "message": "먼저 데이터 수집을 완료해주세요." })
    );
}

#[tokio::test]
async fn test_busy_coordinator_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    let gate = Arc::new(Gate::default());
    let (app, state) = app(
        tmp.path(),
        tmp.path(),
        services().with_gate(Arc::clone(&gate)),
    );

    let (status, _) = post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "all" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "이미 다른 작업이 진행 중입니다.");

    gate.open();
    wait_idle(&state.coordinator).await;
}

#[tokio::test]
async fn test_export_and_download() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = app(tmp.path(), tmp.path(), services());

    let (status, body) = post_json(&app, "/api/export/excel", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "저장할 데이터가 없습니다.");

    post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "1" }))).await;
    wait_idle(&state.coordinator).await;

    let (status, body) = post_json(&app, "/api/export/excel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let filename = body["filename"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri(format!("/api/download/{filename}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(&filename));
}

#[tokio::test]
async fn test_download_rejects_bad_names() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let (status, _) = get_json(&app, "/api/download/.env").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/download/..%2FCargo.toml").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/download/missing.xlsx").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pdf_endpoints_without_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = app(tmp.path(), tmp.path(), services());

    let (status, body) = get_json(&app, "/api/pdf/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "has_bundle": false, "bundle_filename": null }));

    let (status, body) = get_json(&app, "/api/pdf/download").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (status, body) = post_json(&app, "/api/pdf/save", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "저장할 데이터가 없습니다.");
}

#[tokio::test]
async fn test_static_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("index.html"), "<h1>FTC</h1>").unwrap();
    let (app, _) = app(tmp.path(), static_dir.path(), services());

    let request = Request::builder().uri("/index.html").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>FTC</h1>");
}

#[tokio::test]
async fn test_pdf_target_dir_ignored_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let (app, state) = app(tmp.path(), tmp.path(), services());

    post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "1" }))).await;
    wait_idle(&state.coordinator).await;

    let requested = elsewhere.path().join("pdf");
    let (status, body) = post_json(
        &app,
        "/api/pdf/save",
        Some(json!({ "target_dir": requested.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "기본 output 폴더에 PDF 저장을 시작합니다. 완료까지 시간이 소요될 수 있습니다."
    );
    wait_idle(&state.coordinator).await;

    assert!(!requested.exists());
    let (_, body) = get_json(&app, "/api/pdf/status").await;
    assert_eq!(body["has_bundle"], true);
}

#[tokio::test]
async fn test_pdf_target_dir_outside_output_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let (app, state) = app_with_target_dirs(tmp.path(), tmp.path(), services(), true);

    post_json(&app, "/api/scrape/start", Some(json!({ "target_cd": "1" }))).await;
    wait_idle(&state.coordinator).await;

    let requested = elsewhere.path().join("outside").join("deep");
    let (status, _) = post_json(
        &app,
        "/api/pdf/save",
        Some(json!({ "target_dir": requested.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let done = wait_idle(&state.coordinator).await;

    assert!(!elsewhere.path().join("outside").exists());
    assert_eq!(done.current_label, "PDF 저장 완료! 다운로드 버튼을 클릭하세요.");
}
