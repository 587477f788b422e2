//! HTTPサーバー
//!
//! クエリ処理・履歴クリア・セッション終了のエンドポイントを提供する。

pub mod handlers;
pub mod session_cookie;

use crate::config::AppConfig;
use crate::query::QueryService;
use crate::session::start_cleanup_loop;
use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use std::time::Duration;
use tracing::info;

/// Upper bound on the interval between idle-session sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub use session_cookie::{RequestSession, SESSION_COOKIE, SESSION_HEADER};

/// 共有状態
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: QueryService,
}

/// Router with all routes, CORS and request tracing.
pub fn router(service: QueryService, cors: CorsLayer) -> Router {
    Router::new()
        .route("/process_query", post(handlers::process_query))
        .route("/clear_history", post(handlers::clear_history))
        .route("/end_session", post(handlers::end_session))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// CORSレイヤーを作成。許可リストが空なら全オリジンを許可する。
pub fn build_cors(allowed_origins: &[String]) -> Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/'))
                .with_context(|| format!("invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)])
        .allow_credentials(true))
}

/// サーバーを開始
pub async fn serve(config: &AppConfig, service: QueryService) -> Result<()> {
    let sweeper = config
        .history
        .idle_timeout()
        .map(|idle| start_cleanup_loop(service.store(), idle.min(MAX_SWEEP_INTERVAL)));
    let app = router(service, build_cors(&config.server.cors_allowed_origins)?);

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");
    Ok(())
}

/// グレースフルシャットダウンシグナル
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
