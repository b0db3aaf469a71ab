//! Login lockout tests: server throttling mirrored locally

use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use crm_client::api::HttpAuthBackend;
use crm_client::auth::lockout::purpose;
use crm_client::error::ClientError;
use crm_client::storage::FileSessionStore;
use crm_client::{ClientConfig, SessionManager};

/// Fixture login endpoint that always throttles with the given body
/// and optional Retry-After header
async fn start_throttling_backend(
    body: serde_json::Value,
    retry_after_header: Option<&'static str>,
) -> (SocketAddr, Arc<AtomicUsize>) {
    let login_calls = Arc::new(AtomicUsize::new(0));
    let counter = login_calls.clone();

    let login = warp::path!("api" / "auth" / "login")
        .and(warp::post())
        .map(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let reply = warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::TOO_MANY_REQUESTS,
            );
            match retry_after_header {
                Some(value) => {
                    warp::reply::with_header(reply, "Retry-After", value).into_response()
                }
                None => reply.into_response(),
            }
        });

    let (addr, server) = warp::serve(login).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, login_calls)
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        base_url: format!("http://{}", addr),
        request_timeout: Duration::from_secs(5),
        refresh_timeout: Duration::from_secs(2),
        landing_route: "/app".to_string(),
        lockout_fallback_secs: 60,
        session_file: None,
    }
}

async fn manager_for(config: &ClientConfig, path: std::path::PathBuf) -> SessionManager {
    let backend = Arc::new(HttpAuthBackend::new(config).unwrap());
    let store = Arc::new(FileSessionStore::open(path).await.unwrap());
    SessionManager::new(backend, store, config).await.unwrap()
}

#[tokio::test]
async fn test_429_starts_countdown_and_blocks_resubmission() {
    let (addr, login_calls) =
        start_throttling_backend(json!({"message": "Aguarde 45s"}), None).await;
    let config = config_for(addr);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let manager = manager_for(&config, path.clone()).await;

    match manager.login("maria", "pw").await {
        Err(ClientError::TooManyAttempts { retry_after_secs }) => {
            assert_eq!(retry_after_secs, 45);
        }
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }
    assert_eq!(login_calls.load(Ordering::SeqCst), 1);

    let remaining = manager
        .lockout()
        .seconds_remaining(purpose::LOGIN)
        .await
        .unwrap();
    assert!(remaining > 40 && remaining <= 45, "remaining {}", remaining);

    // Locked out locally: the second submission never reaches the server
    match manager.login("maria", "pw").await {
        Err(ClientError::Locked { remaining_secs }) => assert!(remaining_secs > 0),
        other => panic!("expected Locked, got {:?}", other),
    }
    assert_eq!(login_calls.load(Ordering::SeqCst), 1);

    // Simulated reload: the countdown survives in the persisted store
    let manager = manager_for(&config, path).await;
    let remaining = manager
        .lockout()
        .seconds_remaining(purpose::LOGIN)
        .await
        .unwrap();
    assert!(remaining > 0 && remaining <= 45);
    assert!(matches!(
        manager.login("maria", "pw").await,
        Err(ClientError::Locked { .. })
    ));
    assert_eq!(login_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_body_retry_after_preferred_over_message() {
    let (addr, _) = start_throttling_backend(
        json!({"retry_after": 30, "message": "Aguarde 45s"}),
        Some("99"),
    )
    .await;
    let config = config_for(addr);
    let dir = tempfile::tempdir().unwrap();

    let manager = manager_for(&config, dir.path().join("session.json")).await;

    match manager.login("maria", "pw").await {
        Err(ClientError::TooManyAttempts { retry_after_secs }) => {
            assert_eq!(retry_after_secs, 30);
        }
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_after_header_used_when_body_is_silent() {
    let (addr, _) =
        start_throttling_backend(json!({"message": "Muitas tentativas"}), Some("25")).await;
    let config = config_for(addr);
    let dir = tempfile::tempdir().unwrap();

    let manager = manager_for(&config, dir.path().join("session.json")).await;

    match manager.login("maria", "pw").await {
        Err(ClientError::TooManyAttempts { retry_after_secs }) => {
            assert_eq!(retry_after_secs, 25);
        }
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fallback_when_no_duration_is_available() {
    let (addr, _) = start_throttling_backend(json!({"message": "Muitas tentativas"}), None).await;
    let config = config_for(addr);
    let dir = tempfile::tempdir().unwrap();

    let manager = manager_for(&config, dir.path().join("session.json")).await;

    match manager.login("maria", "pw").await {
        Err(ClientError::TooManyAttempts { retry_after_secs }) => {
            assert_eq!(retry_after_secs, 60);
        }
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }
}
