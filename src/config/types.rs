use crate::llm::LlmConfig;
use crate::logging::LogConfig;
use crate::query::{PromptTemplate, DEFAULT_CONTEXT_WINDOW};
use crate::session::{DEFAULT_HISTORY_CAPACITY, DEFAULT_IDLE_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Completion API configuration
    pub llm: LlmConfig,

    /// Per-session history configuration
    pub history: HistoryConfig,

    /// Extraction prompt texts
    pub prompt: PromptTemplate,

    /// Logging configuration
    pub logging: LogConfig,
}

/// サーバー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// 履歴設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// セッション毎に保持する対話数
    pub max_entries: usize,

    /// Interactions shown to the model as context
    pub context_window: usize,

    /// Seconds without activity before a session is discarded. 0 keeps
    /// sessions until `/end_session`.
    pub idle_timeout_secs: u64,
}

impl HistoryConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_HISTORY_CAPACITY,
            context_window: DEFAULT_CONTEXT_WINDOW,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Check values that would otherwise only fail at request time.
    ///
    /// LLM credentials are deliberately not checked here; a missing key is
    /// reported per request.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid server.bind_addr '{}': {}", self.server.bind_addr, e))?;

        for origin in &self.server.cors_allowed_origins {
            let url = url::Url::parse(origin)
                .map_err(|e| anyhow::anyhow!("invalid CORS origin '{}': {}", origin, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("CORS origin '{}' must use http or https", origin);
            }
        }

        if self.history.max_entries == 0 {
            anyhow::bail!("history.max_entries must be at least 1");
        }
        if self.history.context_window == 0 || self.history.context_window > self.history.max_entries {
            anyhow::bail!(
                "history.context_window must be between 1 and history.max_entries ({}), got {}",
                self.history.max_entries,
                self.history.context_window
            );
        }

        if !self.prompt.user.contains("{query}") {
            anyhow::bail!("prompt.user must contain the {{query}} placeholder");
        }

        if self.llm.default_model.trim().is_empty() {
            anyhow::bail!("llm.default_model cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:5000");
        assert!(config.server.cors_allowed_origins.is_empty());
        assert_eq!(config.history.max_entries, 6);
        assert_eq!(config.history.context_window, 5);
        assert_eq!(config.history.idle_timeout(), Some(Duration::from_secs(86_400)));
        assert_eq!(config.llm.default_model, "llama3-8b-8192");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_bounds() {
        let mut config = AppConfig::default();
        config.history.context_window = 7;
        assert!(config.validate().is_err());

        config.history.context_window = 0;
        assert!(config.validate().is_err());

        config.history.context_window = 6;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let mut config = AppConfig::default();
        config.history.idle_timeout_secs = 0;
        assert_eq!(config.history.idle_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_server_values() {
        let mut config = AppConfig::default();
        config.server.bind_addr = "localhost".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.cors_allowed_origins = vec!["ftp://example.com".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prompt_requires_query_placeholder() {
        let mut config = AppConfig::default();
        config.prompt.user = "no placeholders".into();
        assert!(config.validate().is_err());
    }
}
