//! Prompt template for entity extraction.
//!
//! The template is configuration data: both texts can be replaced from the
//! `[prompt]` config section without touching code. The user text may use
//! the `{query}` and `{context}` placeholders.

use crate::llm::Message;
use crate::query::types::Interaction;
use serde::{Deserialize, Serialize};

/// 履歴が空のとき `{context}` に入る文字列
pub const NO_CONTEXT_MARKER: &str = "No previous context";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that extracts company names, performance metrics, and dates from queries.
Always return the response in valid JSON format with the following structure:
{
    "entities": ["company1", "company2"],
    "parameter": "metric_name",
    "dates": {"start": "date1", "end": "date2"}
}
Only include dates if explicitly mentioned in the query.
Respond with the JSON object only, without any surrounding text."#;

pub const DEFAULT_USER_PROMPT: &str = "Query: {query}
Previous context:
{context}

Extract the relevant information and return it in the specified JSON format.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_system() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_user() -> String {
    DEFAULT_USER_PROMPT.to_string()
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: default_system(),
            user: default_user(),
        }
    }
}

impl PromptTemplate {
    /// Pretty JSON of the given interactions, or the no-context marker.
    pub fn render_context(history: &[Interaction]) -> serde_json::Result<String> {
        if history.is_empty() {
            return Ok(NO_CONTEXT_MARKER.to_string());
        }
        serde_json::to_string_pretty(history)
    }

    pub fn render_user(&self, query: &str, history: &[Interaction]) -> serde_json::Result<String> {
        let context = Self::render_context(history)?;
        Ok(fill(&self.user, query, &context))
    }

    /// System + user message pair sent to the completion API.
    pub fn messages(&self, query: &str, history: &[Interaction]) -> serde_json::Result<Vec<Message>> {
        Ok(vec![
            Message::system(self.system.clone()),
            Message::user(self.render_user(query, history)?),
        ])
    }
}

// Single pass so placeholder-looking text inside the query or the history
// is never substituted a second time.
fn fill(template: &str, query: &str, context: &str) -> String {
    let mut out = String::with_capacity(template.len() + query.len() + context.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{query}") {
            out.push_str(query);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
