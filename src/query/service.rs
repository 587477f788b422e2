//! Query processing pipeline.

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmError, ProviderFactory};
use crate::query::error::ExtractionError;
use crate::query::extractor::QueryExtractor;
use crate::query::normalizer::ResultNormalizer;
use crate::query::prompt::PromptTemplate;
use crate::query::types::{Interaction, MetricResult};
use crate::session::{HistoryStore, MemoryHistoryStore, SessionId};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 空クエリに返すメッセージ
pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty";

/// Number of past interactions shown to the model by default.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Ties the model, the normalizer and per-session history together.
///
/// History is only written after a query fully succeeds.
#[derive(Clone)]
pub struct QueryService {
    providers: Arc<dyn ProviderFactory>,
    store: Arc<dyn HistoryStore>,
    template: PromptTemplate,
    model: String,
    context_window: usize,
    normalizer: ResultNormalizer,
}

impl QueryService {
    pub fn new(providers: Arc<dyn ProviderFactory>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            providers,
            store,
            template: PromptTemplate::default(),
            model: crate::llm::config::DEFAULT_MODEL.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            normalizer: ResultNormalizer::new(),
        }
    }

    /// 設定からサービスを構築（インメモリ履歴ストア）
    pub fn from_config(config: &AppConfig) -> Self {
        let store = Arc::new(
            MemoryHistoryStore::with_capacity(config.history.max_entries)
                .with_idle_timeout(config.history.idle_timeout()),
        );
        Self::new(Arc::new(config.llm.clone()), store)
            .with_model(config.llm.default_model.clone())
            .with_template(config.prompt.clone())
            .with_context_window(config.history.context_window)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    pub fn with_normalizer(mut self, normalizer: ResultNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Backing history store, shared with background cleanup.
    pub fn store(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.store)
    }

    /// Interpret `raw_query` in the context of the session's history.
    ///
    /// On success the query and its results are appended to the history.
    /// On any failure the history is left untouched.
    #[instrument(skip_all, fields(session = %session))]
    pub async fn process(&self, session: &SessionId, raw_query: &str) -> Result<Vec<MetricResult>> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Err(Error::Validation(EMPTY_QUERY_MESSAGE.to_string()));
        }

        let context = self.store.get(session).await?.recent(self.context_window);

        let provider = self.providers.create().map_err(|e| match e {
            LlmError::ConfigError(msg) => Error::Config(msg),
            other => Error::Extraction(ExtractionError::Llm(other)),
        })?;

        let extractor =
            QueryExtractor::new(provider, self.model.clone()).with_template(self.template.clone());

        let extraction = extractor.extract(query, &context).await.map_err(|e| {
            warn!(error = %e, "extraction failed");
            e
        })?;
        let results = self.normalizer.normalize(&extraction);

        self.store
            .append(
                session,
                Interaction {
                    query: query.to_string(),
                    results: results.clone(),
                },
            )
            .await?;

        info!(results = results.len(), "query processed");
        Ok(results)
    }

    /// 現在の履歴（古い順）
    pub async fn history(&self, session: &SessionId) -> Result<Vec<Interaction>> {
        let history = self.store.get(session).await?;
        Ok(history.iter().cloned().collect())
    }

    pub async fn clear_history(&self, session: &SessionId) -> Result<()> {
        self.store.clear(session).await?;
        info!(session = %session, "history cleared");
        Ok(())
    }

    /// Drop the session entirely. Returns whether it existed.
    pub async fn end_session(&self, session: &SessionId) -> Result<bool> {
        let existed = self.store.end(session).await?;
        info!(session = %session, existed, "session ended");
        Ok(existed)
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("store", &self.store)
            .field("model", &self.model)
            .field("context_window", &self.context_window)
            .finish()
    }
}
