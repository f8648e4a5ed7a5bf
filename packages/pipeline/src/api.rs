//! HTTP API.

use std::path::{Path as FsPath, PathBuf};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ftclaw_harvester::LawRecord;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::coordinator::CoordinatorHandle;
use crate::error::PipelineError;
use crate::models::{ArchiveStatus, ScrapeTarget, StatusSnapshot};

const NO_BUNDLE_MESSAGE: &str = "다운로드할 PDF 파일이 없습니다. 먼저 PDF 저장을 실행해주세요.";

#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub output_dir: PathBuf,
    /// Whether clients may choose the PDF directory.
    pub allow_pdf_target_dir: bool,
}

/// Build the application router. Unknown paths are served from `static_dir`.
pub fn router(state: AppState, static_dir: impl AsRef<FsPath>) -> Router {
    let api_routes = Router::new()
        .route("/api/scrape/start", post(start_scrape))
        .route("/api/scrape/info", post(start_enrich))
        .route("/api/scrape/status", get(status))
        .route("/api/scrape/results", get(results))
        .route("/api/export/excel", post(export_excel))
        .route("/api/download/{filename}", get(download))
        .route("/api/pdf/save", post(save_pdf))
        .route("/api/pdf/download", get(download_bundle))
        .route("/api/pdf/status", get(pdf_status));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .fallback_service(ServeDir::new(static_dir.as_ref()))
}

/// `{status, message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: String,
}

impl Ack {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub status: &'static str,
    pub message: String,
    pub filename: String,
}

/// Handler error rendered as an `{status: "error"}` body.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::JobConflict(_) => StatusCode::CONFLICT,
            PipelineError::EmptyDataset(_) | PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::CoordinatorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(Ack::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Category code as sent by the page: `"all"`, `"3"` or `3`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetCode {
    Text(String),
    Number(u64),
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeRequest {
    target_cd: Option<TargetCode>,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveRequest {
    target_dir: Option<String>,
}

/// Parse an optional JSON body; an empty body is the default request.
fn optional_json<T>(body: &Bytes) -> ApiResult<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| PipelineError::InvalidInput(format!("invalid request body: {e}")).into())
}

async fn health() -> &'static str {
    "OK"
}

async fn start_scrape(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: ScrapeRequest = optional_json(&body)?;
    let target = match request.target_cd {
        None => ScrapeTarget::parse("1")?,
        Some(TargetCode::Text(code)) => ScrapeTarget::parse(&code)?,
        Some(TargetCode::Number(code)) => ScrapeTarget::parse(&code.to_string())?,
    };

    state.coordinator.start_scrape(target).await?;
    Ok(Json(Ack::success("스크래핑을 시작합니다.")))
}

async fn start_enrich(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    state.coordinator.start_enrich().await?;
    Ok(Json(Ack::success("시행/개정 정보 수집을 시작합니다.")))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusSnapshot>> {
    Ok(Json(state.coordinator.status().await?))
}

async fn results(State(state): State<AppState>) -> ApiResult<Json<Vec<LawRecord>>> {
    Ok(Json(state.coordinator.results().await?))
}

async fn export_excel(State(state): State<AppState>) -> ApiResult<Json<ExportResponse>> {
    let filename = state.coordinator.export().await?;
    Ok(Json(ExportResponse {
        status: "success",
        message: "파일이 성공적으로 생성되었습니다.".to_string(),
        filename,
    }))
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if !is_plain_file_name(&filename) {
        return Err(PipelineError::InvalidInput(format!("invalid file name: {filename}")).into());
    }
    send_file(&state.output_dir.join(&filename)).await
}

async fn save_pdf(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: ArchiveRequest = optional_json(&body)?;
    let requested = request
        .target_dir
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty());
    let target_dir = match requested {
        Some(dir) if state.allow_pdf_target_dir => Some(PathBuf::from(dir)),
        Some(dir) => {
            tracing::info!(target_dir = %dir, "PDF target directories are disabled, using default location");
            None
        }
        None => None,
    };

    let message = match &target_dir {
        Some(dir) => format!(
            "선택하신 폴더({})에 PDF 저장을 시작합니다. 완료까지 시간이 소요될 수 있습니다.",
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string())
        ),
        None => "기본 output 폴더에 PDF 저장을 시작합니다. 완료까지 시간이 소요될 수 있습니다.".to_string(),
    };

    state.coordinator.start_archive(target_dir).await?;
    Ok(Json(Ack::success(message)))
}

async fn download_bundle(State(state): State<AppState>) -> ApiResult<Response> {
    match state.coordinator.archive_path().await? {
        Some(path) => send_file(&path).await,
        None => Err(PipelineError::NotFound(NO_BUNDLE_MESSAGE.to_string()).into()),
    }
}

async fn pdf_status(State(state): State<AppState>) -> ApiResult<Json<ArchiveStatus>> {
    Ok(Json(state.coordinator.archive_status().await?))
}

/// A single path component that does not climb or hide.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.chars().any(|c| matches!(c, '/' | '\\'))
        && FsPath::new(name).file_name().is_some_and(|n| n == name)
}

async fn send_file(path: &FsPath) -> ApiResult<Response> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::NotFound(path.display().to_string()).into());
        }
        Err(e) => return Err(PipelineError::Io(e).into()),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20");

    let headers = [
        (header::CONTENT_TYPE, content_type(path).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{encoded}\"; filename*=UTF-8''{encoded}"),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("zip") => "application/zip",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
