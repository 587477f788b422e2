//! セッション履歴ストアのテスト

use metric_query::query::{Interaction, MetricResult};
use metric_query::session::{HistoryStore, MemoryHistoryStore, SessionId};
use std::sync::Arc;

fn interaction(query: &str) -> Interaction {
    Interaction {
        query: query.to_string(),
        results: vec![MetricResult {
            entity: "Acme".into(),
            parameter: Some("revenue".into()),
            start_date: "2025-10-19".into(),
            end_date: "2026-10-19".into(),
        }],
    }
}

#[tokio::test]
async fn test_session_id_creation() {
    let id1 = SessionId::new();
    let id2 = SessionId::new();

    assert_ne!(id1, id2);
    assert_eq!(id1.as_str().len(), 36);
}

#[tokio::test]
async fn test_reads_do_not_create_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryHistoryStore::new();

    let history = store.get(&SessionId::new()).await?;
    assert!(history.is_empty());
    assert_eq!(store.len().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_history_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryHistoryStore::new();
    let id = SessionId::new();

    for i in 0..10 {
        store.append(&id, interaction(&format!("q{i}"))).await?;
        let len = store.get(&id).await?.len();
        assert_eq!(len, (i + 1).min(6));
    }

    let queries: Vec<_> = store
        .get(&id)
        .await?
        .iter()
        .map(|i| i.query.clone())
        .collect();
    assert_eq!(queries, vec!["q4", "q5", "q6", "q7", "q8", "q9"]);
    Ok(())
}

#[tokio::test]
async fn test_clear_keeps_session_end_removes_it() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryHistoryStore::with_capacity(3);
    let id = SessionId::new();

    store.append(&id, interaction("one")).await?;
    store.clear(&id).await?;
    assert!(store.get(&id).await?.is_empty());
    assert_eq!(store.len().await?, 1);

    assert!(store.end(&id).await?);
    assert_eq!(store.len().await?, 0);
    assert!(!store.end(&id).await?);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_appends() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryHistoryStore::new());
    let id = SessionId::new();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move { store.append(&id, interaction(&format!("q{i}"))).await })
        })
        .collect();

    for handle in handles {
        handle.await??;
    }

    assert_eq!(store.get(&id).await?.len(), 6);
    assert_eq!(store.len().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_idle_sessions_expire() -> Result<(), Box<dyn std::error::Error>> {
    let store =
        MemoryHistoryStore::new().with_idle_timeout(Some(std::time::Duration::from_millis(20)));
    let id = SessionId::new();
    store.append(&id, interaction("before the pause")).await?;

    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert!(store.get(&id).await?.is_empty());
    assert_eq!(store.cleanup_expired().await?, 1);
    assert_eq!(store.len().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_client_session_ids_are_validated() {
    assert!("3f1c2b7e-client_42".parse::<SessionId>().is_ok());
    assert!("has space".parse::<SessionId>().is_err());
    assert!("".parse::<SessionId>().is_err());
}
