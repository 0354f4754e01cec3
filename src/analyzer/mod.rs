pub mod completion;
pub mod prompt;
pub mod response;
pub mod schema;

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::AnalysisCache;
use crate::error::Result;
use crate::llm::{GenerationConfig, LlmRequester};
use crate::pipeline::{RunStage, RunTracker};
use schema::{AnalysisKind, AnalysisResult, PartialAnalysis};

/// Runs a document through the model and returns a completed analysis.
pub struct ProposalAnalyzer {
    requester: LlmRequester,
    cache: Option<Arc<AnalysisCache>>,
}

impl ProposalAnalyzer {
    pub fn new(requester: LlmRequester, cache: Option<Arc<AnalysisCache>>) -> Self {
        ProposalAnalyzer { requester, cache }
    }

    pub async fn analyze_structured(&self, text: &str) -> Result<AnalysisResult> {
        self.analyze_tracked(text, &mut RunTracker::default()).await
    }

    /// Same as [`Self::analyze_structured`], reporting each stage to `tracker`.
    pub async fn analyze_tracked(&self, text: &str, tracker: &mut RunTracker) -> Result<AnalysisResult> {
        let kind = AnalysisKind::StructuredAnalysis;

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text, kind) {
                match serde_json::from_value::<PartialAnalysis>(cached) {
                    Ok(partial) => {
                        info!("Using cached structured analysis");
                        tracker.advance(RunStage::Cached);
                        let result = finish(partial);
                        tracker.advance(RunStage::SchemaCompleted);
                        return Ok(result);
                    }
                    Err(e) => warn!("Cached analysis has an unexpected shape, re-analyzing: {}", e),
                }
            }
        }

        let prompt = prompt::build_structured_analysis_prompt(text);
        let config = GenerationConfig::json_output(schema::response_schema());
        tracker.advance(RunStage::Prompted);

        tracker.advance(RunStage::LlmRequested);
        let raw = match self.requester.send(&prompt, Some(&config)).await {
            Ok(raw) => {
                tracker.advance(RunStage::LlmSucceeded);
                raw
            }
            Err(e) => {
                tracker.advance(RunStage::LlmFailed);
                return Err(e);
            }
        };

        let parsed = response::parse_analysis_json(&raw)?;
        let partial: PartialAnalysis = serde_json::from_value(parsed.clone())?;
        tracker.advance(RunStage::ResponseParsed);

        let result = finish(partial);
        tracker.advance(RunStage::SchemaCompleted);

        if let Some(cache) = &self.cache {
            if cache.set(text, kind, &parsed) {
                tracker.advance(RunStage::Cached);
            }
        }

        Ok(result)
    }
}

fn finish(partial: PartialAnalysis) -> AnalysisResult {
    let completion = completion::complete(partial);
    if !completion.substitutions.is_empty() {
        info!("Completed {} missing fields", completion.substitutions.len());
    }
    completion.result
}
