use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("파일 디코딩 실패: {0}")]
    FileDecoding(String),

    #[error("지원하지 않는 파일 형식: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ExtractionEmpty(String),

    #[error("{0}")]
    ParseError(String),

    #[error("{0}")]
    LlmAuth(String),

    #[error("{0}")]
    LlmTransient(String),

    #[error("API 응답이 비어있습니다.")]
    LlmEmptyResponse,

    #[error("AI 응답을 구조화된 데이터로 변환하는데 실패했습니다. (JSON Parsing Error: {0})")]
    JsonParse(String),

    #[error("보고서 생성 실패: {0}")]
    Render(String),

    #[error("저장소 오류: {0}")]
    Storage(String),

    #[error("요청이 취소되었습니다.")]
    Cancelled,

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileDecoding(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::ExtractionEmpty(_) | AppError::ParseError(_) | AppError::JsonParse(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::LlmAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::LlmTransient(_) | AppError::LlmEmptyResponse => StatusCode::BAD_GATEWAY,
            AppError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            AppError::Render(_) | AppError::Storage(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonParse(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LlmTransient(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
