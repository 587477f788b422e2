//! チャット完了APIとやり取りする型
//!
//! 抽出プロンプトは常に system + user の2メッセージで構成されるため、
//! ロールもその2つだけを持つ。

use serde::{Deserialize, Serialize};

/// メッセージのロール
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 抽出ルールを伝える指示
    System,
    /// クエリと履歴を埋め込んだ本文
    User,
}

/// Single chat message as sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion round trip. Sampling settings come from the provider's
/// config; only the model can be chosen per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// `None` falls back to the configured default model
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
        }
    }

    /// モデルを指定
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// 最初の選択肢だけを取り出した完了結果
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// Raw text of the first choice. Expected to hold the extraction JSON.
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// テキストだけの完了結果（テスト用プロバイダーなどで使用）
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: TokenUsage::default(),
            finish_reason: None,
        }
    }
}

/// Token accounting reported by the API, logged per extraction.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
    #[serde(default)]
    pub total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let json = serde_json::to_value(Message::system("extract")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "extract"}));

        let json = serde_json::to_value(Message::user("Query: Acme")).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_request_model_is_optional() {
        let request = ChatRequest::new(vec![Message::user("hi")]);
        assert!(request.model.is_none());
        assert_eq!(
            request.with_model("llama3-8b-8192").model.as_deref(),
            Some("llama3-8b-8192")
        );
    }

    #[test]
    fn test_usage_tolerates_missing_fields() {
        let usage: TokenUsage = serde_json::from_str(r#"{"prompt_tokens": 12}"#).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.total_tokens, 0);
    }
}
