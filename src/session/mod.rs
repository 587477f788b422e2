//! セッション管理
//!
//! セッション毎の会話履歴（直近のクエリと結果）を保持する。
//! 履歴はLLMに文脈として渡され、フォローアップクエリの解釈に使われる。
//! 一定時間操作の無いセッションは破棄される。

pub mod storage;
pub mod types;

pub use storage::{
    start_cleanup_loop, HistoryStore, MemoryHistoryStore, DEFAULT_IDLE_TIMEOUT_SECS,
};
pub use types::{History, SessionId, SessionRecord, DEFAULT_HISTORY_CAPACITY};

/// セッション管理エラー
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Client-supplied id outside `[A-Za-z0-9_-]{1,128}`
    #[error("Invalid session id: {0}")]
    InvalidId(String),
}
