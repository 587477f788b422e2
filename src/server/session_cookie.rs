//! セッション識別
//!
//! `X-Session-ID` ヘッダー、次に `metric_query_session` クッキーの順で
//! セッションIDを探す。どちらも無ければ新しいIDを発行し、レスポンスで
//! クッキーを設定する。

use crate::error::Error;
use crate::session::SessionId;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use std::convert::Infallible;
use tracing::debug;

/// セッションクッキー名
pub const SESSION_COOKIE: &str = "metric_query_session";
/// セッションIDヘッダー名
pub const SESSION_HEADER: &str = "x-session-id";

/// リクエストに紐づくセッション
#[derive(Debug, Clone)]
pub struct RequestSession {
    pub id: SessionId,
    /// このリクエストで発行されたIDかどうか
    pub is_new: bool,
}

impl RequestSession {
    /// ヘッダーからセッションを解決
    pub fn resolve(headers: &HeaderMap) -> Self {
        let existing = header_session_id(headers).or_else(|| cookie_session_id(headers));

        match existing {
            Some(id) => Self { id, is_new: false },
            None => {
                let id = SessionId::new();
                debug!(session = %id, "新しいセッションを発行");
                Self { id, is_new: true }
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.headers))
    }
}

fn header_session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_session_id(value, "header"))
}

fn cookie_session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| parse_session_id(value, "cookie"))
}

fn parse_session_id(raw: &str, source: &'static str) -> Option<SessionId> {
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(e) => {
            debug!(source, error = %e, "ignoring session id");
            None
        }
    }
}

/// セッションクッキーを設定する `Set-Cookie` 値
pub fn session_cookie(id: &SessionId) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        id.as_str()
    ))
    .map_err(|e| Error::Internal(format!("invalid session cookie: {}", e)))
}

/// セッションクッキーを失効させる `Set-Cookie` 値
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("metric_query_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
