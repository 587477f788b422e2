//! LLMプロバイダー実装

pub mod openai;

use crate::llm::{
    config::LlmConfig,
    error::LlmResult,
    types::{ChatCompletion, ChatRequest},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use openai::OpenAiCompatibleProvider;

/// LLMプロバイダートレイト
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 通常の完了リクエスト
    async fn complete(&self, request: &ChatRequest) -> LlmResult<ChatCompletion>;

    /// プロバイダー名を取得
    fn name(&self) -> &str;
}

/// プロバイダーファクトリー
///
/// リクエスト毎に呼ばれるため、認証情報の欠落はそのリクエストの
/// 設定エラーとして表面化する。
pub trait ProviderFactory: Send + Sync {
    fn create(&self) -> LlmResult<Arc<dyn LlmProvider>>;
}

impl ProviderFactory for LlmConfig {
    fn create(&self) -> LlmResult<Arc<dyn LlmProvider>> {
        Ok(Arc::new(OpenAiCompatibleProvider::new(self.clone())?))
    }
}

/// 構築済みのプロバイダーをそのまま返すファクトリー
#[derive(Clone)]
pub struct FixedProvider(pub Arc<dyn LlmProvider>);

impl ProviderFactory for FixedProvider {
    fn create(&self) -> LlmResult<Arc<dyn LlmProvider>> {
        Ok(Arc::clone(&self.0))
    }
}
