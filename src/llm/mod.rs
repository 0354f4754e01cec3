//! Generative-model access.
//!
//! A [`LlmBackend`] performs exactly one request. Retries, failure
//! classification and cancellation live in [`request::LlmRequester`].

pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod request;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub use gemini::GeminiClient;
#[cfg(test)]
pub use mock::ScriptedBackend;
pub use request::{LlmRequester, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("API response was empty")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Sampling and output-format options sent as `generationConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl GenerationConfig {
    /// Requests JSON output constrained to `schema`.
    pub fn json_output(schema: Value) -> Self {
        GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Default::default()
        }
    }

    /// Fields set on `self` win over `base`.
    pub fn merged_over(&self, base: &GenerationConfig) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature.or(base.temperature),
            top_p: self.top_p.or(base.top_p),
            top_k: self.top_k.or(base.top_k),
            max_output_tokens: self.max_output_tokens.or(base.max_output_tokens),
            response_mime_type: self.response_mime_type.clone().or_else(|| base.response_mime_type.clone()),
            response_schema: self.response_schema.clone().or_else(|| base.response_schema.clone()),
        }
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, prompt: &str, config: Option<&GenerationConfig>) -> Result<String, LlmError>;
}

/// Builds a backend for a caller-supplied API key.
pub type BackendFactory = Arc<dyn Fn(&str) -> Arc<dyn LlmBackend> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_over_prefers_call_values() {
        let base = GenerationConfig {
            temperature: Some(0.7),
            top_k: Some(40),
            ..Default::default()
        };
        let call = GenerationConfig::json_output(serde_json::json!({"type": "OBJECT"}));
        let merged = call.merged_over(&base);

        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.top_k, Some(40));
        assert_eq!(merged.response_mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_generation_config_serializes_camel_case() {
        let config = GenerationConfig {
            max_output_tokens: Some(8192),
            response_mime_type: Some("application/json".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["maxOutputTokens"], 8192);
        assert_eq!(value["responseMimeType"], "application/json");
        assert!(value.get("temperature").is_none());
    }
}
