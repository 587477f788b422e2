//! LLM統合システム
//!
//! OpenAI互換のチャット完了API（Groq、OpenAI、互換サーバー）との
//! 統合機能を提供します。

pub mod config;
pub mod error;
pub mod providers;
pub mod types;

pub use config::{LlmConfig, LlmProvider as LlmProviderKind};
pub use error::{LlmError, LlmResult};
pub use providers::{FixedProvider, LlmProvider, OpenAiCompatibleProvider, ProviderFactory};
pub use types::{ChatCompletion, ChatRequest, Message, Role, TokenUsage};
