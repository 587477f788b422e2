//! LLMによるエンティティ抽出

use crate::llm::{ChatRequest, LlmProvider, Message};
use crate::query::error::ExtractionError;
use crate::query::prompt::PromptTemplate;
use crate::query::types::{Extraction, Interaction};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sends a query plus recent history to the model and validates the answer.
pub struct QueryExtractor {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    model: String,
}

impl QueryExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            model: model.into(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Messages for `query`. `context` is embedded as given, oldest first;
    /// the caller decides how much history to show.
    pub fn build_messages(
        &self,
        query: &str,
        context: &[Interaction],
    ) -> Result<Vec<Message>, ExtractionError> {
        self.template
            .messages(query, context)
            .map_err(|e| ExtractionError::Prompt(e.to_string()))
    }

    /// One completion round trip. Exactly one provider call per invocation.
    #[instrument(skip_all, fields(provider = self.provider.name(), context = context.len()))]
    pub async fn extract(
        &self,
        query: &str,
        context: &[Interaction],
    ) -> Result<Extraction, ExtractionError> {
        let messages = self.build_messages(query, context)?;
        if let Some(prompt) = messages.last() {
            debug!(prompt = %prompt.content, "Sending extraction prompt");
        }

        let request = ChatRequest::new(messages).with_model(self.model.clone());
        let response = self.provider.complete(&request).await?;
        debug!(raw = %response.content, "Received extraction response");

        Extraction::from_content(&response.content)
    }
}

impl std::fmt::Debug for QueryExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExtractor")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
