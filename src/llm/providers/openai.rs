//! OpenAI互換プロバイダー実装
//!
//! Groq / OpenAI / 互換サーバーの `/chat/completions` に対して
//! 単一の同期的なリクエストを送る。リトライもストリーミングもしない。

use crate::llm::{
    config::{LlmConfig, LlmProvider as ProviderKind},
    error::{LlmError, LlmResult},
    providers::LlmProvider,
    types::{ChatCompletion, ChatRequest, Message, TokenUsage},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// OpenAI互換プロバイダー
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleProvider {
    /// 新しいプロバイダーを作成
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    fn build_body<'a>(&'a self, request: &'a ChatRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: request
                .model
                .as_deref()
                .unwrap_or(self.config.default_model.as_str()),
            messages: &request.messages,
            temperature: self.config.default_temperature,
            max_tokens: self.config.default_max_tokens,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    #[instrument(skip_all, fields(model = tracing::field::Empty))]
    async fn complete(&self, request: &ChatRequest) -> LlmResult<ChatCompletion> {
        let body = self.build_body(request);
        tracing::Span::current().record("model", body.model);

        let mut http_request = self.client.post(self.completions_url()).json(&body);
        if let Some(api_key) = self.config.get_api_key() {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, &error_text));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let api_response: ChatCompletionResponse = serde_json::from_str(&raw)?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ApiError("No choices in response".to_string()))?;

        let usage = api_response.usage.unwrap_or_default();

        debug!(
            total_tokens = usage.total_tokens,
            finish_reason = ?choice.finish_reason,
            "chat completion received"
        );

        Ok(ChatCompletion {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        match self.config.provider {
            ProviderKind::Groq => "Groq",
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Custom => "Custom",
        }
    }
}

/// チャット完了リクエスト
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

/// チャット完了レスポンス
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

/// 選択肢
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(LlmConfig::groq("test-key", "llama3-8b-8192")).unwrap()
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            provider().completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_uses_default_model() {
        let provider = provider();
        let request = ChatRequest::new(vec![Message::system("s"), Message::user("u")]);
        let body = serde_json::to_value(provider.build_body(&request)).unwrap();

        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_request_body_model_override_and_sampling_from_config() {
        let mut config = LlmConfig::groq("test-key", "llama3-8b-8192");
        config.default_temperature = Some(0.0);
        config.default_max_tokens = Some(256);
        let provider = OpenAiCompatibleProvider::new(config).unwrap();

        let request = ChatRequest::new(vec![Message::user("u")]).with_model("llama3-70b-8192");
        let body = serde_json::to_value(provider.build_body(&request)).unwrap();

        assert_eq!(body["model"], "llama3-70b-8192");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_response_parsing_takes_first_choice() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "llama3-8b-8192",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"entities\":[]}"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 2);
        assert_eq!(parsed.usage.unwrap_or_default().total_tokens, 15);
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"entities\":[]}")
        );
    }
}
