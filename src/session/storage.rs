use crate::query::types::Interaction;
use crate::session::types::{History, SessionId, SessionRecord, DEFAULT_HISTORY_CAPACITY};
use crate::session::SessionError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Idle time after which a session's history is discarded.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 86_400;

/// Session-scoped history store.
///
/// Reads never create a session; the first `append` does.
#[async_trait]
pub trait HistoryStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: &SessionId) -> Result<History, SessionError>;
    async fn append(&self, id: &SessionId, interaction: Interaction) -> Result<(), SessionError>;
    async fn clear(&self, id: &SessionId) -> Result<(), SessionError>;
    /// Discard the whole session. Returns whether it existed.
    async fn end(&self, id: &SessionId) -> Result<bool, SessionError>;
    async fn len(&self) -> Result<usize, SessionError>;
    /// 期限切れセッションを削除し、削除件数を返す
    async fn cleanup_expired(&self) -> Result<usize, SessionError>;
}

/// In-memory store. Sessions idle for longer than the timeout read as
/// empty and are dropped by [`HistoryStore::cleanup_expired`].
#[derive(Debug)]
pub struct MemoryHistoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
    capacity: usize,
    idle_timeout: Option<Duration>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            capacity,
            idle_timeout: Some(Duration::seconds(DEFAULT_IDLE_TIMEOUT_SECS as i64)),
        }
    }

    /// `None` keeps sessions until they are ended explicitly.
    pub fn with_idle_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.idle_timeout = timeout.and_then(|t| Duration::from_std(t).ok());
        self
    }

    fn is_live(&self, record: &SessionRecord) -> bool {
        match self.idle_timeout {
            Some(idle) => !record.is_idle_for(idle, Utc::now()),
            None => true,
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get(&self, id: &SessionId) -> Result<History, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|record| self.is_live(record))
            .map(|record| record.history.clone())
            .unwrap_or_else(|| History::new(self.capacity)))
    }

    async fn append(&self, id: &SessionId, interaction: Interaction) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let capacity = self.capacity;
        let record = sessions
            .entry(id.clone())
            .or_insert_with(|| SessionRecord::new(capacity));
        if !self.is_live(record) {
            debug!(session = %id, "idle session restarted");
            record.history.clear();
        }
        record.history.push(interaction);
        record.touch();
        debug!(session = %id, entries = record.history.len(), "history updated");
        Ok(())
    }

    async fn clear(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get_mut(id) {
            record.history.clear();
            record.touch();
        }
        Ok(())
    }

    async fn end(&self, id: &SessionId) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(id).is_some())
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }

    async fn cleanup_expired(&self) -> Result<usize, SessionError> {
        if self.idle_timeout.is_none() {
            return Ok(0);
        }
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| self.is_live(record));
        Ok(before - sessions.len())
    }
}

/// 一定間隔で期限切れセッションを掃除するタスクを起動
pub fn start_cleanup_loop(
    store: Arc<dyn HistoryStore>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        // 最初のtickは即時に完了する
        timer.tick().await;

        loop {
            timer.tick().await;
            match store.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => {
                    let remaining = store.len().await.unwrap_or_default();
                    info!(removed, remaining, "expired sessions removed");
                }
                Err(e) => warn!(error = %e, "session cleanup failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(query: &str) -> Interaction {
        Interaction {
            query: query.to_string(),
            results: Vec::new(),
        }
    }

    fn short_lived() -> MemoryHistoryStore {
        MemoryHistoryStore::new().with_idle_timeout(Some(std::time::Duration::from_millis(20)))
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_empty() {
        let store = MemoryHistoryStore::new();
        let history = store.get(&SessionId::new()).await.unwrap();
        assert!(history.is_empty());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_caps_history() {
        let store = MemoryHistoryStore::new();
        let id = SessionId::new();
        for i in 0..7 {
            store.append(&id, interaction(&format!("q{}", i))).await.unwrap();
        }

        let history = store.get(&id).await.unwrap();
        assert_eq!(history.len(), 6);
        assert!(history.iter().all(|i| i.query != "q0"));
    }

    #[tokio::test]
    async fn test_clear_keeps_session() {
        let store = MemoryHistoryStore::new();
        let id = SessionId::new();
        store.append(&id, interaction("q")).await.unwrap();

        store.clear(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_empty());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_end_removes_session() {
        let store = MemoryHistoryStore::new();
        let id = SessionId::new();
        store.append(&id, interaction("q")).await.unwrap();

        assert!(store.end(&id).await.unwrap());
        assert!(!store.end(&id).await.unwrap());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MemoryHistoryStore::new();
        let a = SessionId::new();
        let b = SessionId::new();
        store.append(&a, interaction("for a")).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap().len(), 1);
        assert!(store.get(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_idle_session_reads_empty_and_is_swept() {
        let store = short_lived();
        let stale = SessionId::new();
        store.append(&stale, interaction("old")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let fresh = SessionId::new();
        store.append(&fresh, interaction("new")).await.unwrap();

        assert!(store.get(&stale).await.unwrap().is_empty());
        assert_eq!(store.get(&fresh).await.unwrap().len(), 1);

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(!store.end(&stale).await.unwrap());
    }

    #[tokio::test]
    async fn test_append_to_idle_session_starts_over() {
        let store = short_lived();
        let id = SessionId::new();
        store.append(&id, interaction("before")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store.append(&id, interaction("after")).await.unwrap();

        let queries: Vec<_> = store
            .get(&id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.query.clone())
            .collect();
        assert_eq!(queries, vec!["after"]);
    }

    #[tokio::test]
    async fn test_without_timeout_nothing_expires() {
        let store = MemoryHistoryStore::new().with_idle_timeout(None);
        let id = SessionId::new();
        store.append(&id, interaction("q")).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert_eq!(store.get(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_loop_sweeps_in_background() {
        let store = Arc::new(short_lived());
        store.append(&SessionId::new(), interaction("q")).await.unwrap();

        let handle = start_cleanup_loop(store.clone(), std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        handle.abort();

        assert_eq!(store.len().await.unwrap(), 0);
    }
}
