use axum::{
    routing::{delete, get, post},
    Router,
    extract::{DefaultBodyLimit, Json, Multipart, Path, State},
    http::StatusCode,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::models::{AnalysisRequest, CacheClearResponse, HealthResponse, HistoryDeleteResponse, StatusResponse};
use crate::api::response::{self, ApiResponse};
use crate::cache::CacheStats;
use crate::config::{Config, ALLOWED_EXTENSIONS};
use crate::error::{AppError, Result};
use crate::history::HistoryEntry;
use crate::parser::{file_extension, UploadedFile};
use crate::pipeline::RunOutput;
use crate::AppState;

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>)>;

/// Files accepted in one multipart upload.
pub const MAX_UPLOAD_FILES: usize = 10;

const BODY_HEADROOM: usize = 1024 * 1024;

pub fn create_router(app_state: AppState) -> Router {
    let max_file = app_state.config.max_file_size_bytes() as usize;
    // Base64 inflates the single JSON upload by a third
    let json_limit = max_file / 3 * 4 + BODY_HEADROOM;
    // Per-file size is checked in the handler; the body only caps the whole batch
    let multipart_limit = max_file * MAX_UPLOAD_FILES + BODY_HEADROOM;

    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .route(
            "/api/analyze/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(multipart_limit)),
        )
        .route("/api/history", get(history_handler))
        .route("/api/history/:id", get(get_history_handler).delete(delete_history_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .layer(DefaultBodyLimit::max(json_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "RFP Analyzer API is running",
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> ApiResult<Value> {
    info!("Analyze request for {}", req.filename);

    let api_key = resolve_api_key(&state.config, &req.api_key)?;
    let bytes = BASE64
        .decode(req.file_content.trim())
        .map_err(|e| AppError::FileDecoding(e.to_string()))?;
    let file = checked_upload(&state.config, req.filename, bytes)?;

    let output = run_analysis(&state, &api_key, vec![file]).await?;
    Ok(response::success(output.result.to_value()))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let mut files = Vec::new();
    let mut api_key = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if files.len() == MAX_UPLOAD_FILES {
                    return Err(AppError::Validation(format!(
                        "한 번에 최대 {}개 파일까지 업로드할 수 있습니다.",
                        MAX_UPLOAD_FILES
                    )));
                }
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                files.push(checked_upload(&state.config, filename, bytes.to_vec())?);
            }
            Some("api_key") => api_key = field.text().await.map_err(multipart_error)?,
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(AppError::Validation("업로드된 파일이 없습니다.".to_string()));
    }
    info!("Upload request for {} file(s)", files.len());

    let api_key = resolve_api_key(&state.config, &api_key)?;
    let output = run_analysis(&state, &api_key, files).await?;
    Ok(response::success(output.result.to_value()))
}

async fn history_handler(State(state): State<AppState>) -> ApiResult<Vec<HistoryEntry>> {
    Ok(response::success(state.history.get_all()))
}

async fn get_history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HistoryEntry> {
    match state.history.get(&id) {
        Some(entry) => Ok(response::success(entry)),
        None => Ok(response::error(StatusCode::NOT_FOUND, format!("히스토리 항목을 찾을 수 없습니다: {}", id))),
    }
}

async fn delete_history_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HistoryDeleteResponse> {
    if state.history.delete_entry(&id)? {
        Ok(response::success(HistoryDeleteResponse { deleted: id }))
    } else {
        Ok(response::error(StatusCode::NOT_FOUND, format!("히스토리 항목을 찾을 수 없습니다: {}", id)))
    }
}

async fn cache_stats_handler(State(state): State<AppState>) -> ApiResult<CacheStats> {
    Ok(response::success(state.cache.stats()))
}

async fn clear_cache_handler(State(state): State<AppState>) -> ApiResult<CacheClearResponse> {
    let removed = state.cache.clear();
    Ok(response::success(CacheClearResponse { removed }))
}

/// Runs the pipeline under the configured request timeout.
async fn run_analysis(state: &AppState, api_key: &str, files: Vec<UploadedFile>) -> Result<RunOutput> {
    let start_time = std::time::Instant::now();
    let cancel = CancellationToken::new();
    let pipeline = state.pipeline(api_key, cancel.clone());

    let result = tokio::time::timeout(state.config.request_timeout, pipeline.run(files)).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(Ok(output)) => {
            info!("Analysis finished in {:?} (history: {:?})", elapsed, output.history_id);
            Ok(output)
        }
        Ok(Err(err)) => {
            error!("Analysis failed after {:?}: {}", elapsed, err);
            Err(err)
        }
        Err(_) => {
            cancel.cancel();
            error!("Request timed out after {:?}", elapsed);
            Err(AppError::Cancelled)
        }
    }
}

/// A request key wins; an empty one falls back to `GEMINI_API_KEY`.
fn resolve_api_key(config: &Config, requested: &str) -> Result<String> {
    let requested = requested.trim();
    if !requested.is_empty() {
        return Ok(requested.to_string());
    }
    config
        .gemini_api_key
        .clone()
        .ok_or_else(|| AppError::Validation("API 키가 설정되지 않았습니다. api_key를 입력하거나 GEMINI_API_KEY를 설정하세요.".to_string()))
}

fn checked_upload(config: &Config, filename: String, bytes: Vec<u8>) -> Result<UploadedFile> {
    let ext = file_extension(&filename);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::UnsupportedFormat(if ext.is_empty() { filename } else { ext }));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("빈 파일입니다: {}", filename)));
    }
    if bytes.len() as u64 > config.max_file_size_bytes() {
        return Err(AppError::Validation(format!(
            "파일 크기가 너무 큽니다: {} (최대 {}MB)",
            filename, config.max_file_size_mb
        )));
    }
    Ok(UploadedFile::new(filename, bytes))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("잘못된 업로드 요청입니다: {}", err))
}
