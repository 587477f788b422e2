use crate::query::types::Interaction;
use crate::session::SessionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Interactions kept per session.
pub const DEFAULT_HISTORY_CAPACITY: usize = 6;

const MAX_SESSION_ID_LEN: usize = 128;

/// セッションID
///
/// 新規発行はUUID v4。クライアントから受け取るIDは英数字・`-`・`_` のみ、
/// 128文字以内に限る（[`str::parse`] で検証）。
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_SESSION_ID_LEN
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(SessionError::InvalidId(s.chars().take(32).collect()))
        }
    }
}

/// Bounded, ordered record of past interactions. Oldest entries are
/// dropped first once `capacity` is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<Interaction>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, interaction: Interaction) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(interaction);
    }

    /// The last `n` interactions, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Interaction> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Per-session state held by a store.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub history: History,
    pub last_active: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::new(capacity),
            last_active: Utc::now(),
        }
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// 最終アクティビティから `idle` 以上経過したか
    pub fn is_idle_for(&self, idle: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_active >= idle
    }
}
