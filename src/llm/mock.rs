use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{GenerationConfig, LlmBackend, LlmError};

/// Replays a fixed script of outcomes, one per call, without touching the network.
///
/// Once the script runs out the last outcome keeps repeating.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    last: Mutex<Option<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        ScriptedBackend {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `response`.
    pub fn always(response: impl Into<String>) -> Self {
        Self::new(vec![Ok(response.into())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str, _config: Option<&GenerationConfig>) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(match &outcome {
                    Ok(text) => Ok(text.clone()),
                    Err(e) => Err(e.to_string()),
                });
                outcome
            }
            None => match last.as_ref() {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(LlmError::Transport(message.clone())),
                None => Err(LlmError::EmptyResponse),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replays_in_order_then_repeats() {
        let backend = ScriptedBackend::new(vec![
            Err(LlmError::Timeout("slow".into())),
            Ok("done".into()),
        ]);

        assert!(backend.generate("p", None).await.is_err());
        assert_eq!(backend.generate("p", None).await.unwrap(), "done");
        assert_eq!(backend.generate("p", None).await.unwrap(), "done");
        assert_eq!(backend.calls(), 3);
    }
}
