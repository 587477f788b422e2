//! LLM統合のエラー型定義

use thiserror::Error;

/// LLM統合システムのエラー型
#[derive(Error, Debug)]
pub enum LlmError {
    /// API呼び出しエラー
    #[error("API error: {0}")]
    ApiError(String),

    /// 認証エラー
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// レート制限エラー
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// ネットワークエラー
    #[error("Network error: {0}")]
    NetworkError(String),

    /// タイムアウト
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// JSONパースエラー
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify a non-2xx response. 401/403 are auth failures, 429 is rate
    /// limiting, anything else is a generic API error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = format!("{} - {}", status, body.trim());
        match status.as_u16() {
            401 | 403 => LlmError::AuthError(detail),
            429 => LlmError::RateLimitError(detail),
            _ => LlmError::ApiError(detail),
        }
    }
}

/// LLM統合システムの結果型
pub type LlmResult<T> = Result<T, LlmError>;
