//! One analysis run, from uploaded files to a history record.
//!
//! ```text
//! Uploaded → Parsed → Prompted → LlmRequested → LlmFailed | LlmSucceeded
//!          → ResponseParsed → SchemaCompleted → Cached → Rendered → HistoryRecorded
//! ```
//!
//! A cache hit jumps from `Parsed` straight to `Cached`. Parse, model and
//! render failures abort the run and nothing is recorded. A failed history
//! write is logged and the analysis is still returned.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analyzer::schema::AnalysisResult;
use crate::analyzer::ProposalAnalyzer;
use crate::error::{AppError, Result};
use crate::history::{HistoryKind, HistoryStore};
use crate::parser::{DocumentIntegrator, UploadedFile};
use crate::report::{report_file_name, ReportRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Uploaded,
    Parsed,
    Prompted,
    LlmRequested,
    LlmFailed,
    LlmSucceeded,
    ResponseParsed,
    SchemaCompleted,
    Cached,
    Rendered,
    HistoryRecorded,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Uploaded => "uploaded",
            RunStage::Parsed => "parsed",
            RunStage::Prompted => "prompted",
            RunStage::LlmRequested => "llm_requested",
            RunStage::LlmFailed => "llm_failed",
            RunStage::LlmSucceeded => "llm_succeeded",
            RunStage::ResponseParsed => "response_parsed",
            RunStage::SchemaCompleted => "schema_completed",
            RunStage::Cached => "cached",
            RunStage::Rendered => "rendered",
            RunStage::HistoryRecorded => "history_recorded",
        };
        f.write_str(name)
    }
}

/// Records and logs the stages a run passes through.
#[derive(Debug, Clone)]
pub struct RunTracker {
    stages: Vec<RunStage>,
}

impl Default for RunTracker {
    fn default() -> Self {
        RunTracker {
            stages: vec![RunStage::Uploaded],
        }
    }
}

impl RunTracker {
    pub fn advance(&mut self, next: RunStage) {
        info!("Run stage: {} -> {}", self.current(), next);
        self.stages.push(next);
    }

    pub fn current(&self) -> RunStage {
        self.stages.last().copied().unwrap_or(RunStage::Uploaded)
    }

    pub fn stages(&self) -> &[RunStage] {
        &self.stages
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: AnalysisResult,
    pub history_id: Option<String>,
    pub stages: Vec<RunStage>,
}

pub struct Pipeline {
    integrator: DocumentIntegrator,
    analyzer: ProposalAnalyzer,
    history: Option<Arc<HistoryStore>>,
    renderer: Option<Arc<dyn ReportRenderer>>,
}

impl Pipeline {
    pub fn new(integrator: DocumentIntegrator, analyzer: ProposalAnalyzer) -> Self {
        Pipeline {
            integrator,
            analyzer,
            history: None,
            renderer: None,
        }
    }

    pub fn with_history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub async fn run(&self, files: Vec<UploadedFile>) -> Result<RunOutput> {
        let mut tracker = RunTracker::default();
        let file_names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        info!("Starting analysis run for {:?}", file_names);

        let integrator = self.integrator.clone();
        let text = tokio::task::spawn_blocking(move || integrator.parse_multiple_files(&files))
            .await
            .map_err(|e| AppError::ParseError(format!("문서 파싱 작업이 중단되었습니다: {}", e)))??;
        tracker.advance(RunStage::Parsed);

        let result = self.analyzer.analyze_tracked(&text, &mut tracker).await?;

        // Kept alive until the report has been copied into the history store
        let report_dir = match &self.renderer {
            Some(renderer) => {
                let dir = tempfile::Builder::new().prefix("rfp-report-").tempdir()?;
                let path = dir.path().join(report_file_name(&result.summary.project_name));
                renderer.render(&result, &path).map_err(|e| {
                    error!("Report rendering failed: {}", e);
                    match e {
                        AppError::Render(_) => e,
                        other => AppError::Render(other.to_string()),
                    }
                })?;
                tracker.advance(RunStage::Rendered);
                Some((dir, path))
            }
            None => None,
        };

        let history_id = self.record(&mut tracker, file_names, &result, report_dir.as_ref().map(|(_, p)| p));

        Ok(RunOutput {
            result,
            history_id,
            stages: tracker.stages().to_vec(),
        })
    }

    fn record(
        &self,
        tracker: &mut RunTracker,
        files: Vec<String>,
        result: &AnalysisResult,
        report: Option<&PathBuf>,
    ) -> Option<String> {
        let history = self.history.as_ref()?;
        match history.add_entry(HistoryKind::Analysis, files, result.to_value(), report.map(|p| p.as_path()), None, None) {
            Ok(entry) => {
                tracker.advance(RunStage::HistoryRecorded);
                Some(entry.id)
            }
            Err(e) => {
                warn!("Failed to record history, returning analysis anyway: {}", e);
                None
            }
        }
    }
}
