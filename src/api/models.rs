use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub filename: String,
    /// Base64-encoded file bytes.
    pub file_content: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct CacheClearResponse {
    pub removed: usize,
}

#[derive(Serialize)]
pub struct HistoryDeleteResponse {
    pub deleted: String,
}
