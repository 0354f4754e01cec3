use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{GenerationConfig, LlmBackend, LlmError};
use crate::error::{AppError, Result};

/// How many times a failed request is retried and how long to wait between tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy { max_retries, delay }
    }

    /// Delay before retry number `attempt + 1`. Constant for now.
    pub fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::fixed(3, Duration::from_secs(2))
    }
}

/// Sends prompts through a backend with bounded retries.
pub struct LlmRequester {
    backend: Arc<dyn LlmBackend>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl LlmRequester {
    pub fn new(backend: Arc<dyn LlmBackend>, policy: RetryPolicy) -> Self {
        LlmRequester {
            backend,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn send(&self, prompt: &str, config: Option<&GenerationConfig>) -> Result<String> {
        let mut attempt: u32 = 0;

        loop {
            info!("Sending LLM request (attempt {})", attempt + 1);

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                outcome = self.backend.generate(prompt, config) => outcome,
            };

            let err = match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    info!("LLM request succeeded (attempt {})", attempt + 1);
                    return Ok(text);
                }
                Ok(_) | Err(LlmError::EmptyResponse) => {
                    error!("LLM returned an empty response (attempt {})", attempt + 1);
                    return Err(AppError::LlmEmptyResponse);
                }
                Err(err) => err,
            };

            let message = err.to_string();
            error!("LLM request failed (attempt {}): {}", attempt + 1, message);

            if is_key_or_request_error(&err) {
                return Err(AppError::LlmAuth(format!(
                    "API 키 오류 또는 잘못된 요청입니다. ({})",
                    message
                )));
            }

            if attempt >= self.policy.max_retries {
                warn!("Giving up after {} attempts", attempt + 1);
                return Err(classify_api_error(&message));
            }

            let delay = self.policy.delay_for(attempt);
            info!("Retrying in {:?}", delay);
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

fn is_key_or_request_error(err: &LlmError) -> bool {
    matches!(err, LlmError::Status { status: 400, .. }) || err.to_string().contains("API key")
}

/// Maps a final API failure to a user-facing message.
pub fn classify_api_error(message: &str) -> AppError {
    let lower = message.to_lowercase();

    if message.contains("API key") || lower.contains("authentication") {
        AppError::LlmAuth("API 키가 유효하지 않습니다. 설정을 확인해주세요.".to_string())
    } else if lower.contains("quota") {
        AppError::LlmTransient("API 사용량 한도를 초과했습니다.".to_string())
    } else if lower.contains("timeout") {
        AppError::LlmTransient("API 요청 시간이 초과되었습니다. 다시 시도해주세요.".to_string())
    } else if lower.contains("rate limit") {
        AppError::LlmTransient("API 요청 횟수 제한에 도달했습니다. 잠시 후 다시 시도해주세요.".to_string())
    } else {
        AppError::LlmTransient(format!("API 호출 중 오류가 발생했습니다: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedBackend;

    fn requester(backend: Arc<ScriptedBackend>) -> LlmRequester {
        LlmRequester::new(backend, RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_success_after_two_timeouts() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(LlmError::Timeout("deadline exceeded".into())),
            Err(LlmError::Timeout("deadline exceeded".into())),
            Ok("{\"ok\": true}".into()),
        ]));

        let text = requester(backend.clone()).send("prompt", None).await.unwrap();
        assert_eq!(text, "{\"ok\": true}");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_api_key_error_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(LlmError::Transport(
            "API key invalid".into(),
        ))]));

        let err = requester(backend.clone()).send("prompt", None).await.unwrap_err();
        assert!(matches!(err, AppError::LlmAuth(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(LlmError::Status {
            status: 400,
            message: "Invalid JSON payload".into(),
        })]));

        let err = requester(backend.clone()).send("prompt", None).await.unwrap_err();
        assert!(matches!(err, AppError::LlmAuth(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("   ".into())]));

        let err = requester(backend.clone()).send("prompt", None).await.unwrap_err();
        assert!(matches!(err, AppError::LlmEmptyResponse));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_are_classified() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(LlmError::Status {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".into(),
        })]));

        let err = requester(backend.clone()).send("prompt", None).await.unwrap_err();
        assert_eq!(backend.calls(), 4);
        assert!(matches!(err, AppError::LlmTransient(ref msg) if msg.contains("한도")));
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(LlmError::Transport(
            "connection reset".into(),
        ))]));
        let cancel = CancellationToken::new();
        let requester = LlmRequester::new(backend.clone(), RetryPolicy::fixed(3, Duration::from_secs(30)))
            .with_cancellation(cancel.clone());

        let handle = tokio::spawn(async move { requester.send("prompt", None).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_classify_generic_message() {
        let err = classify_api_error("internal error");
        assert!(err.to_string().contains("internal error"));
        assert!(matches!(classify_api_error("Request timeout: x"), AppError::LlmTransient(ref m) if m.contains("시간")));
    }
}
