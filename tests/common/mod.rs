//! テスト用の共通ヘルパー

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use metric_query::llm::{
    ChatCompletion, ChatRequest, FixedProvider, LlmError, LlmProvider, LlmResult,
};
use metric_query::query::{QueryService, ResultNormalizer};
use metric_query::session::MemoryHistoryStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 固定の「今日」
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// 応答を順番に返すフェイクプロバイダー
///
/// 応答が尽きたら最後の応答を繰り返す。
#[derive(Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    last: Mutex<Option<String>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    pub fn replying(reply: &str) -> Arc<Self> {
        Self::with_replies(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: LlmError) -> Arc<Self> {
        Self::with_replies(vec![Err(error)])
    }

    pub fn with_replies(replies: Vec<LlmResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// n番目の呼び出しで送られたユーザープロンプト
    pub fn user_prompt(&self, n: usize) -> String {
        self.requests()[n].messages.last().unwrap().content.clone()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: &ChatRequest) -> LlmResult<ChatCompletion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(Ok(content)) => {
                *self.last.lock().unwrap() = Some(content.clone());
                content
            }
            Some(Err(error)) => return Err(error),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "{}".to_string()),
        };

        Ok(ChatCompletion::text(reply, "fake-model"))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// フェイクプロバイダーと固定日付で構成したサービス
pub fn service_with(provider: Arc<FakeProvider>) -> QueryService {
    QueryService::new(
        Arc::new(FixedProvider(provider)),
        Arc::new(MemoryHistoryStore::new()),
    )
    .with_normalizer(ResultNormalizer::with_today(today()))
}

/// LLM応答JSONを組み立てる
pub fn reply(entities: &[&str], parameter: &str, start: Option<&str>, end: Option<&str>) -> String {
    let mut dates = serde_json::Map::new();
    if let Some(start) = start {
        dates.insert("start".into(), start.into());
    }
    if let Some(end) = end {
        dates.insert("end".into(), end.into());
    }
    serde_json::json!({
        "entities": entities,
        "parameter": parameter,
        "dates": dates,
    })
    .to_string()
}
