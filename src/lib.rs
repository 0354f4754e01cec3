pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod report;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use analyzer::ProposalAnalyzer;
use cache::AnalysisCache;
use config::Config;
use error::Result;
use history::HistoryStore;
use llm::{BackendFactory, GeminiClient, LlmBackend, LlmRequester, RetryPolicy};
use parser::{DocumentIntegrator, FormatExtractor, TextExtractor};
use pipeline::Pipeline;
use report::ReportRenderer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<AnalysisCache>,
    pub history: Arc<HistoryStore>,
    pub backend_factory: BackendFactory,
    pub extractor: Arc<dyn TextExtractor>,
    pub renderer: Option<Arc<dyn ReportRenderer>>,
}

impl AppState {
    /// Opens the cache and history store under `config.data_dir` and talks to Gemini.
    pub fn new(config: Config) -> Result<Self> {
        let cache = AnalysisCache::new(config.cache_dir(), config.cache_ttl_hours)?
            .with_key_prefix(config.cache_key_prefix_chars);
        let history = HistoryStore::new(&config.data_dir)?;

        let model = config.gemini_model.clone();
        let base_url = config.gemini_base_url.clone();
        let backend_factory: BackendFactory = Arc::new(move |api_key: &str| {
            Arc::new(
                GeminiClient::new(api_key)
                    .with_model(model.clone())
                    .with_base_url(base_url.clone()),
            ) as Arc<dyn LlmBackend>
        });

        Ok(AppState {
            config: Arc::new(config),
            cache: Arc::new(cache),
            history: Arc::new(history),
            backend_factory,
            extractor: Arc::new(FormatExtractor),
            renderer: None,
        })
    }

    pub fn with_backend_factory(mut self, factory: BackendFactory) -> Self {
        self.backend_factory = factory;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Builds the pipeline for one request, authenticated with `api_key`.
    pub fn pipeline(&self, api_key: &str, cancel: CancellationToken) -> Pipeline {
        let policy = RetryPolicy::fixed(self.config.max_retries, self.config.retry_delay);
        let requester = LlmRequester::new((self.backend_factory)(api_key), policy).with_cancellation(cancel);
        let analyzer = ProposalAnalyzer::new(requester, Some(self.cache.clone()));

        let pipeline = Pipeline::new(DocumentIntegrator::new(self.extractor.clone()), analyzer)
            .with_history(self.history.clone());
        match &self.renderer {
            Some(renderer) => pipeline.with_renderer(renderer.clone()),
            None => pipeline,
        }
    }
}
