//! Extraction error types.

use crate::llm::LlmError;
use thiserror::Error;

/// Failure to turn a query into an [`Extraction`](super::Extraction).
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Transport or API failure talking to the completion service
    #[error("LLM processing failed: {0}")]
    Llm(#[from] LlmError),

    /// レスポンスがJSONではない
    #[error("LLM processing failed: response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// JSONの形が期待と異なる
    #[error("LLM processing failed: {0}")]
    Schema(String),

    /// The prompt could not be assembled
    #[error("LLM processing failed: could not render prompt: {0}")]
    Prompt(String),
}

impl ExtractionError {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        ExtractionError::Schema(msg.into())
    }
}
