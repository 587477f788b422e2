//! LLM統合の設定

use crate::llm::error::{LlmError, LlmResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// APIキーを読み込む環境変数
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
/// モデル名を上書きする環境変数
pub const MODEL_ENV: &str = "GROQ_MODEL";

/// デフォルトモデル
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Groq OpenAI互換エンドポイント
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// OpenAIエンドポイント
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// LLMプロバイダー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Groq (OpenAI互換API)
    Groq,
    /// OpenAI
    OpenAI,
    /// カスタムのOpenAI互換エンドポイント
    Custom,
}

/// LLM設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// プロバイダー
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    /// APIキー（セキュア）
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    /// APIエンドポイント（ベースURLの上書き）
    #[serde(default)]
    pub endpoint: Option<String>,
    /// デフォルトモデル
    #[serde(default = "default_model")]
    pub default_model: String,
    /// リクエストタイムアウト（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Sampling temperature. `None` leaves it to the API.
    #[serde(default)]
    pub default_temperature: Option<f32>,
    /// 最大トークン数（未指定ならAPI側のデフォルト）
    #[serde(default)]
    pub default_max_tokens: Option<usize>,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Groq
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl LlmConfig {
    /// Groq設定を作成
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::new(api_key.into().into_boxed_str())),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// OpenAI設定を作成
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            ..Self::groq(api_key, model)
        }
    }

    /// カスタムエンドポイント設定を作成
    pub fn custom(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Custom,
            endpoint: Some(endpoint.into()),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// Base URL requests are sent to: the endpoint override, else the
    /// provider's default.
    pub fn base_url(&self) -> &str {
        if let Some(endpoint) = self.endpoint.as_deref() {
            return endpoint.trim_end_matches('/');
        }
        match self.provider {
            LlmProvider::OpenAI => OPENAI_BASE_URL,
            LlmProvider::Groq | LlmProvider::Custom => GROQ_BASE_URL,
        }
    }

    /// タイムアウトを取得
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// APIキーを取得（露出）
    pub fn get_api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.trim().is_empty())
    }

    /// 設定を検証
    pub fn validate(&self) -> LlmResult<()> {
        match self.provider {
            LlmProvider::Groq | LlmProvider::OpenAI => {
                if self.get_api_key().is_none() {
                    return Err(LlmError::ConfigError(format!(
                        "API key cannot be empty (set {})",
                        API_KEY_ENV
                    )));
                }
            }
            LlmProvider::Custom => {
                if self.endpoint.is_none() {
                    return Err(LlmError::ConfigError(
                        "Endpoint is required for custom providers".to_string(),
                    ));
                }
            }
        }

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint).map_err(|e| {
                LlmError::ConfigError(format!("Invalid endpoint '{}': {}", endpoint, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LlmError::ConfigError(format!(
                    "Endpoint must use http or https: {}",
                    endpoint
                )));
            }
        }

        if self.default_model.trim().is_empty() {
            return Err(LlmError::ConfigError("Model cannot be empty".to_string()));
        }

        if let Some(temperature) = self.default_temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(LlmError::ConfigError(
                    "Temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }

        if self.default_max_tokens == Some(0) {
            return Err(LlmError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            endpoint: None,
            default_model: default_model(),
            timeout_secs: default_timeout(),
            default_temperature: None,
            default_max_tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_config() {
        let config = LlmConfig::groq("test-key", "llama3-8b-8192");
        assert_eq!(config.provider, LlmProvider::Groq);
        assert_eq!(config.base_url(), GROQ_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = LlmConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());

        let blank = LlmConfig::groq("   ", "llama3-8b-8192");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_custom_endpoint() {
        let config = LlmConfig::custom("http://localhost:11434/v1/", "llama3");
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost:11434/v1");

        let bad = LlmConfig::custom("not a url", "llama3");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let mut config = LlmConfig::openai("test-key", "gpt-4o-mini");
        config.default_temperature = Some(3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_max_tokens() {
        let mut config = LlmConfig::openai("test-key", "gpt-4o-mini");
        config.default_max_tokens = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = LlmConfig::groq("super-secret", "llama3-8b-8192");
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("super-secret"));
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
