//! Integration tests for 401 recovery and single-flight token refresh.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use smart_parking_client::{
    ApiClient, ApiError, AuthState, FileStore, KeyValueStore, MemoryStore, SessionEvent,
    SessionStore,
};
use smart_parking_core::Booking;
use smart_parking_integration_tests::{
    INITIAL_ACCESS, MockBackend, PASSWORD, REFRESH_TOKEN, REFRESHED_ACCESS, temp_session_file,
};
use tokio::sync::broadcast::Receiver;

const CONCURRENT_REQUESTS: usize = 8;

async fn logged_in(backend: &MockBackend, session: SessionStore) -> ApiClient {
    let client = backend.client(session);
    client
        .login("driver", &SecretString::from(PASSWORD.to_string()))
        .await
        .unwrap();
    client
}

fn drain(events: &mut Receiver<SessionEvent>) -> Vec<SessionEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

// =============================================================================
// Single-flight refresh
// =============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;

    backend.expire_access();
    backend.delay_refresh(Duration::from_millis(150));

    let results = join_all((0..CONCURRENT_REQUESTS).map(|_| {
        let client = client.clone();
        async move { client.user_bookings().await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok), "{results:?}");
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(
        client.session().access_token().unwrap().expose_secret(),
        REFRESHED_ACCESS
    );
}

#[tokio::test]
async fn test_requests_spawned_on_tasks_share_one_refresh() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;

    backend.expire_access();
    backend.delay_refresh(Duration::from_millis(100));

    let handles: Vec<_> = (0..CONCURRENT_REQUESTS)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.user_bookings().await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_and_persists_access() {
    let backend = MockBackend::start().await;
    let path = temp_session_file("refresh");
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&path));
    let client = logged_in(&backend, SessionStore::new(Arc::clone(&storage))).await;

    backend.expire_access();
    client.user_bookings().await.unwrap();

    let session = client.session();
    assert_eq!(session.access_token().unwrap().expose_secret(), REFRESHED_ACCESS);
    assert_eq!(session.refresh_token().unwrap().expose_secret(), REFRESH_TOKEN);

    // A fresh process sees the refreshed access token
    let restored = SessionStore::new(Arc::new(FileStore::new(&path)));
    assert_eq!(restored.check_auth_status(), AuthState::Authenticated);
    assert_eq!(restored.access_token().unwrap().expose_secret(), REFRESHED_ACCESS);
    assert_eq!(restored.refresh_token().unwrap().expose_secret(), REFRESH_TOKEN);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;

    backend.rotate_refresh("r2");
    backend.expire_access();
    client.user_bookings().await.unwrap();

    assert_eq!(
        client.session().refresh_token().unwrap().expose_secret(),
        "r2"
    );

    // The rotated token is the one presented next time
    backend.expire_access();
    client.user_bookings().await.unwrap();
    assert_eq!(backend.refresh_calls(), 2);
}

#[tokio::test]
async fn test_refresh_emits_event() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;
    let mut events = client.session().subscribe();

    backend.expire_access();
    client.user_bookings().await.unwrap();

    assert_eq!(drain(&mut events), [SessionEvent::TokensRefreshed]);
}

// =============================================================================
// Refresh failure
// =============================================================================

#[tokio::test]
async fn test_failed_refresh_expires_every_waiter() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStore::new());
    let client = logged_in(&backend, SessionStore::new(storage.clone())).await;
    let mut events = client.session().subscribe();

    backend.expire_access();
    backend.fail_refresh();
    backend.delay_refresh(Duration::from_millis(100));

    let results = join_all((0..CONCURRENT_REQUESTS).map(|_| {
        let client = client.clone();
        async move { client.user_bookings().await }
    }))
    .await;

    assert!(
        results
            .iter()
            .all(|result| matches!(result, Err(ApiError::AuthExpired))),
        "{results:?}"
    );
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(client.session().state(), AuthState::Anonymous);
    assert!(storage.is_empty());
    assert_eq!(drain(&mut events), [SessionEvent::Expired]);
}

#[tokio::test]
async fn test_request_after_expiry_does_not_refresh() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;

    backend.expire_access();
    backend.fail_refresh();
    assert!(matches!(
        client.user_bookings().await,
        Err(ApiError::AuthExpired)
    ));

    // Anonymous now: the 401 is reported as-is
    let err = client.user_bookings().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn test_session_without_refresh_token_expires() {
    let backend = MockBackend::start().await;
    let client = backend.client(SessionStore::in_memory());
    client
        .login("legacy", &SecretString::from(PASSWORD.to_string()))
        .await
        .unwrap();
    assert!(client.session().refresh_token().is_none());

    backend.expire_access();
    assert!(matches!(
        client.user_bookings().await,
        Err(ApiError::AuthExpired)
    ));
    assert_eq!(backend.refresh_calls(), 0);
    assert!(!client.session().is_authenticated());
}

// =============================================================================
// Session replaced while a refresh is in flight
// =============================================================================

/// Start a refresh for `driver`'s stale token, then log out and log in as
/// `bob` before the refresh answers. Returns the stale request's result.
async fn relogin_during_refresh(
    backend: &MockBackend,
    client: &ApiClient,
) -> Result<Vec<Booking>, ApiError> {
    backend.expire_access();
    backend.delay_refresh(Duration::from_millis(300));

    let stale = tokio::spawn({
        let client = client.clone();
        async move { client.user_bookings().await }
    });
    while backend.refresh_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    client.logout().await;
    backend.issue_login_tokens("bob-access", "bob-refresh");
    client
        .login("bob", &SecretString::from(PASSWORD.to_string()))
        .await
        .unwrap();

    stale.await.unwrap()
}

fn assert_bob_session(client: &ApiClient) {
    let session = client.session();
    assert_eq!(session.state(), AuthState::Authenticated);
    assert_eq!(session.user().unwrap().username, "bob");
    assert_eq!(session.access_token().unwrap().expose_secret(), "bob-access");
    assert_eq!(session.refresh_token().unwrap().expose_secret(), "bob-refresh");
}

#[tokio::test]
async fn test_late_refresh_success_does_not_touch_new_session() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStore::new());
    let client = logged_in(&backend, SessionStore::new(storage.clone())).await;

    let err = relogin_during_refresh(&backend, &client).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.requires_login());
    assert_eq!(backend.refresh_calls(), 1);
    assert_bob_session(&client);

    // Storage still pairs bob with his own tokens
    let restored = SessionStore::new(storage);
    assert_eq!(restored.check_auth_status(), AuthState::Authenticated);
    assert_eq!(restored.user().unwrap().username, "bob");
    assert_eq!(restored.access_token().unwrap().expose_secret(), "bob-access");

    client.user_bookings().await.unwrap();
}

#[tokio::test]
async fn test_late_refresh_failure_does_not_expire_new_session() {
    let backend = MockBackend::start().await;
    let storage = Arc::new(MemoryStore::new());
    let client = logged_in(&backend, SessionStore::new(storage.clone())).await;
    let mut events = client.session().subscribe();
    backend.fail_refresh();

    let err = relogin_during_refresh(&backend, &client).await.unwrap_err();

    assert!(!matches!(err, ApiError::AuthExpired));
    assert_bob_session(&client);
    assert!(!storage.is_empty());
    assert!(!drain(&mut events).contains(&SessionEvent::Expired));

    client.user_bookings().await.unwrap();
    assert_eq!(backend.refresh_calls(), 1);
}

// =============================================================================
// Public reads
// =============================================================================

#[tokio::test]
async fn test_public_read_with_stale_token_refreshes_and_retries() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;
    backend.expire_access();

    let slots = client.available_slots().await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.presented_refresh_tokens(), [REFRESH_TOKEN]);
    assert_eq!(
        backend.public_bearers(),
        [
            Some(INITIAL_ACCESS.to_string()),
            Some(REFRESHED_ACCESS.to_string())
        ]
    );
}

#[tokio::test]
async fn test_anonymous_public_read_sends_no_token() {
    let backend = MockBackend::start().await;
    let client = backend.client(SessionStore::in_memory());

    client.slots().await.unwrap();

    assert_eq!(backend.public_bearers(), [None]);
    assert_eq!(backend.refresh_calls(), 0);
}

// =============================================================================
// Requests that must not refresh
// =============================================================================

#[tokio::test]
async fn test_bad_login_does_not_refresh() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend, SessionStore::in_memory()).await;
    backend.expire_access();

    let err = client
        .login("driver", &SecretString::from("wrong".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::RequestFailed { status: 401, ref message, .. } if message == "Invalid credentials"
    ));
    assert_eq!(backend.refresh_calls(), 0);
    // The existing session is untouched
    assert_eq!(
        client.session().access_token().unwrap().expose_secret(),
        INITIAL_ACCESS
    );
}

#[tokio::test]
async fn test_anonymous_401_is_not_recovered() {
    let backend = MockBackend::start().await;
    let client = backend.client(SessionStore::in_memory());

    let err = client.user_bookings().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.requires_login());
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.protected_calls(), 1);
}
