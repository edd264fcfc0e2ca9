//! Integration tests for the Smart Parking client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p smart-parking-integration-tests
//! ```
//!
//! No backend is needed: every test starts a [`MockBackend`], an axum server
//! on an ephemeral port that speaks the backend's JWT and JSON conventions
//! and counts what it was asked to do.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use smart_parking_client::{ApiClient, ClientConfig, SessionStore};
use tokio::task::JoinHandle;

/// Password the mock accepts for every user.
pub const PASSWORD: &str = "secret1";
/// Access token issued at login.
pub const INITIAL_ACCESS: &str = "a1";
/// Refresh token issued at login.
pub const REFRESH_TOKEN: &str = "r1";
/// Access token issued by a successful refresh.
pub const REFRESHED_ACCESS: &str = "a2";

#[derive(Default)]
struct MockState {
    valid_access: Mutex<HashSet<String>>,
    login_tokens: Mutex<(String, String)>,
    staff_session: AtomicBool,
    refresh_calls: AtomicUsize,
    refresh_fails: AtomicBool,
    refresh_delay: Mutex<Duration>,
    rotated_refresh: Mutex<Option<String>>,
    accepted_refresh: Mutex<Option<String>>,
    logout_calls: AtomicUsize,
    logout_status: AtomicU16,
    outage: AtomicBool,
    protected_calls: AtomicUsize,
    public_bearers: Mutex<Vec<Option<String>>>,
    presented_refresh: Mutex<Vec<String>>,
    profile: Mutex<Option<Value>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the Smart Parking backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            logout_status: AtomicU16::new(200),
            login_tokens: Mutex::new((INITIAL_ACCESS.to_string(), REFRESH_TOKEN.to_string())),
            accepted_refresh: Mutex::new(Some(REFRESH_TOKEN.to_string())),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/api/health/", get(health))
            .route("/api/auth/login/", post(login))
            .route("/api/auth/logout/", post(logout))
            .route("/api/auth/token/refresh/", post(refresh))
            .route("/api/slots/", get(slots))
            .route("/api/slots/available/", get(slots))
            .route("/api/slots/{id}/", get(slot))
            .route("/api/bookings/user/", get(user_bookings))
            .route("/api/bookings/create/", post(create_booking))
            .route("/api/user/profile/", get(profile).put(update_profile))
            .route("/api/admin/slots/", get(admin_slots))
            .route("/api/admin/dashboard/", get(dashboard))
            .route("/api/admin/slots/{id}/delete/", delete(delete_slot))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Origin to hand to [`ClientConfig::new`].
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client for this backend bound to `session`.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn client(&self, session: SessionStore) -> ApiClient {
        let config = ClientConfig::new(&self.base_url()).expect("Mock URL is valid");
        ApiClient::new(&config, session).expect("Failed to build client")
    }

    /// Invalidate every issued access token so the next authenticated
    /// request gets a 401.
    pub fn expire_access(&self) {
        lock(&self.state.valid_access).clear();
    }

    /// Issue `access` and `refresh` to subsequent logins.
    pub fn issue_login_tokens(&self, access: &str, refresh: &str) {
        *lock(&self.state.login_tokens) = (access.to_string(), refresh.to_string());
    }

    /// Reject every refresh attempt.
    pub fn fail_refresh(&self) {
        self.state.refresh_fails.store(true, Ordering::SeqCst);
    }

    /// Hold each refresh response for `delay`.
    pub fn delay_refresh(&self, delay: Duration) {
        *lock(&self.state.refresh_delay) = delay;
    }

    /// Issue `refresh` alongside the new access token on refresh.
    pub fn rotate_refresh(&self, refresh: &str) {
        *lock(&self.state.rotated_refresh) = Some(refresh.to_string());
    }

    /// Answer logout with `status`.
    pub fn set_logout_status(&self, status: u16) {
        self.state.logout_status.store(status, Ordering::SeqCst);
    }

    /// Make the slot listings fail with 500.
    pub fn set_outage(&self, outage: bool) {
        self.state.outage.store(outage, Ordering::SeqCst);
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.state.logout_calls.load(Ordering::SeqCst)
    }

    /// Protected requests received, accepted or not.
    #[must_use]
    pub fn protected_calls(&self) -> usize {
        self.state.protected_calls.load(Ordering::SeqCst)
    }

    /// Bearer token of each slot listing request, in arrival order.
    #[must_use]
    pub fn public_bearers(&self) -> Vec<Option<String>> {
        lock(&self.state.public_bearers).clone()
    }

    /// Refresh tokens presented to the refresh endpoint, in arrival order.
    #[must_use]
    pub fn presented_refresh_tokens(&self) -> Vec<String> {
        lock(&self.state.presented_refresh).clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// An origin nothing is listening on.
///
/// # Panics
///
/// Panics if no ephemeral port can be reserved.
#[allow(clippy::expect_used)]
#[must_use]
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to reserve a port");
    let addr = listener.local_addr().expect("Listener has no address");
    drop(listener);
    format!("http://{addr}")
}

/// A session file path unique to this process and call.
#[must_use]
pub fn temp_session_file(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    std::env::temp_dir().join(format!(
        "smart-parking-it-{name}-{}-{}.json",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ))
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn invalid_token() -> Response {
    error(
        StatusCode::UNAUTHORIZED,
        json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"}),
    )
}

/// Check the bearer token against the issued access tokens.
fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);

    match bearer(headers) {
        Some(presented) if lock(&state.valid_access).contains(presented) => Ok(()),
        _ => Err(invalid_token()),
    }
}

/// Public routes serve anonymous callers but, like DRF's JWT
/// authentication, reject a bearer token that is no longer valid.
fn authenticate_optional(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let presented = bearer(headers);
    lock(&state.public_bearers).push(presented.map(str::to_string));

    match presented {
        Some(presented) if !lock(&state.valid_access).contains(presented) => Err(invalid_token()),
        _ => Ok(()),
    }
}

fn sample_slot(id: i64, number: &str, status: &str) -> Value {
    json!({
        "id": id,
        "slot_number": number,
        "floor": "G",
        "zone": "Main Entrance",
        "slot_type": "standard",
        "slot_size": "medium",
        "status": status,
        "base_rate_per_hour": "30.00",
        "premium_rate_per_hour": "0.00",
        "total_rate_per_hour": 30.0,
        "is_ev_charging": false,
        "is_handicap_accessible": false,
        "is_covered": true,
        "has_security_camera": true,
        "features_list": ["Covered", "Security Camera"],
        "location_notes": "",
        "is_active": true
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Smart Parking API",
        "timestamp": "2026-10-19T08:00:00Z"
    }))
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if username.is_empty() || password != PASSWORD {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid credentials"}),
        );
    }

    let (access, refresh) = lock(&state.login_tokens).clone();
    lock(&state.valid_access).insert(access.clone());
    *lock(&state.accepted_refresh) = Some(refresh.clone());
    state
        .staff_session
        .store(username == "admin", Ordering::SeqCst);

    let user = json!({
        "id": 1,
        "username": username,
        "email": format!("{username}@example.com"),
        "is_staff": username == "admin",
        "is_superuser": false
    });
    *lock(&state.profile) = Some(user.clone());

    if username == "legacy" {
        return Json(json!({"token": access})).into_response();
    }
    Json(json!({
        "message": "Login successful",
        "user": user,
        "tokens": {"refresh": refresh, "access": access}
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(state.logout_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error(status, json!({"message": "Logout processed"}))
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let presented = body.get("refresh").and_then(Value::as_str);
    if let Some(presented) = presented {
        lock(&state.presented_refresh).push(presented.to_string());
    }
    // Validated on arrival; a login during the delay does not revoke it.
    let accepted = lock(&state.accepted_refresh).clone();
    let valid = presented.is_some() && presented == accepted.as_deref();

    let delay = *lock(&state.refresh_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if state.refresh_fails.load(Ordering::SeqCst) || !valid {
        return error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
        );
    }

    lock(&state.valid_access).insert(REFRESHED_ACCESS.to_string());
    match lock(&state.rotated_refresh).clone() {
        Some(rotated) => {
            *lock(&state.accepted_refresh) = Some(rotated.clone());
            Json(json!({"access": REFRESHED_ACCESS, "refresh": rotated})).into_response()
        }
        None => Json(json!({"access": REFRESHED_ACCESS})).into_response(),
    }
}

async fn slots(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authenticate_optional(&state, &headers) {
        return rejection;
    }
    if state.outage.load(Ordering::SeqCst) {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "database is locked"}),
        );
    }
    Json(json!([
        sample_slot(1, "G-A-101", "available"),
        sample_slot(2, "G-A-102", "occupied"),
    ]))
    .into_response()
}

async fn slot(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authenticate_optional(&state, &headers) {
        return rejection;
    }
    if id == 1 {
        Json(sample_slot(1, "G-A-101", "available")).into_response()
    } else {
        error(
            StatusCode::NOT_FOUND,
            json!({"detail": "No ParkingSlot matches the given query."}),
        )
    }
}

async fn user_bookings(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!([])).into_response()
}

async fn create_booking(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    error(
        StatusCode::BAD_REQUEST,
        json!({"start_time": ["Start time cannot be in the past"]}),
    )
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let user = lock(&state.profile).clone().unwrap_or(Value::Null);
    Json(json!({
        "user": user,
        "stats": {"total_bookings": 2, "active_bookings": 1, "completed_bookings": 1, "total_spent": 60.0},
        "recent_bookings": []
    }))
    .into_response()
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let mut profile = lock(&state.profile);
    if let (Some(Value::Object(user)), Value::Object(changes)) = (profile.as_mut(), changes) {
        user.extend(changes);
    }
    Json(json!({"message": "Profile updated", "user": profile.clone()})).into_response()
}

/// Bearer check plus the staff flag of the last login.
fn authorize_staff(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    authorize(state, headers)?;
    if state.staff_session.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(error(
            StatusCode::FORBIDDEN,
            json!({"error": "Admin access required"}),
        ))
    }
}

async fn admin_slots(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize_staff(&state, &headers) {
        return rejection;
    }
    slots(State(state), headers).await
}

async fn dashboard(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize_staff(&state, &headers) {
        return rejection;
    }
    Json(json!({
        "slot_stats": {"total": 2, "available": 1, "occupied": 1, "maintenance": 0, "utilization_rate": 50.0},
        "booking_stats": {"total": 0, "active": 0, "completed": 0, "completion_rate": 0},
        "revenue_stats": {"total_revenue": 0, "today_revenue": 0, "average_booking_value": 0},
        "recent_bookings": [],
        "popular_slots": []
    }))
    .into_response()
}

async fn delete_slot(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}
