//! HTTP handlers.

use super::session_cookie::{expired_session_cookie, session_cookie, RequestSession};
use super::AppState;
use crate::error::Error;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

/// `POST /process_query` body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// POST /process_query
#[instrument(skip_all, fields(session = %session.id))]
pub async fn process_query(
    State(state): State<AppState>,
    session: RequestSession,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(request)) => {
            let query = request.query.unwrap_or_default();
            debug!(query = %query, "process_query");
            state.service.process(&session.id, &query).await
        }
        Err(rejection) => Err(Error::Validation(rejection.body_text())),
    };

    let response = match result {
        Ok(results) => Json(results).into_response(),
        Err(e) => e.into_response(),
    };
    with_session_cookie(&session, response)
}

/// POST /clear_history
#[instrument(skip_all, fields(session = %session.id))]
pub async fn clear_history(State(state): State<AppState>, session: RequestSession) -> Response {
    let response = match state.service.clear_history(&session.id).await {
        Ok(()) => Json(json!({ "message": "History cleared." })).into_response(),
        Err(e) => e.into_response(),
    };
    with_session_cookie(&session, response)
}

/// POST /end_session
#[instrument(skip_all, fields(session = %session.id))]
pub async fn end_session(State(state): State<AppState>, session: RequestSession) -> Response {
    match state.service.end_session(&session.id).await {
        Ok(_) => {
            let mut response = Json(json!({ "message": "Session ended." })).into_response();
            response
                .headers_mut()
                .insert(header::SET_COOKIE, expired_session_cookie());
            response
        }
        Err(e) => e.into_response(),
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// 新規発行したセッションにだけクッキーを付与
fn with_session_cookie(session: &RequestSession, mut response: Response) -> Response {
    if !session.is_new {
        return response;
    }
    match session_cookie(&session.id) {
        Ok(cookie) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
            response
        }
        Err(e) => e.into_response(),
    }
}
