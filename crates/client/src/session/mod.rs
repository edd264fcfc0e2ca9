//! Session store: the single source of truth for who is logged in.
//!
//! # Persistence
//!
//! The session is written through to a [`KeyValueStore`] under two keys:
//!
//! - `authTokens` - `{"access": "...", "refresh": "..." | null}`
//! - `user` - the JSON user profile
//!
//! Older installs stored a bare access token under `authToken` and the
//! refresh token under `refreshToken`. [`SessionStore::check_auth_status`]
//! migrates those once; [`SessionStore::logout`] removes all four keys.
//!
//! # States
//!
//! ```text
//! Anonymous --login--> Authenticated
//! Authenticated --logout--> Anonymous
//! Authenticated --expire--> Anonymous (refresh failed)
//! ```
//!
//! A user record is held if and only if an access token is held.

pub mod storage;

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smart_parking_core::UserProfile;
use tokio::sync::broadcast;

pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Storage key for the token pair.
pub const TOKENS_KEY: &str = "authTokens";
/// Storage key for the user profile.
pub const USER_KEY: &str = "user";
/// Legacy storage key holding a bare access token.
pub const LEGACY_ACCESS_KEY: &str = "authToken";
/// Legacy storage key holding a bare refresh token.
pub const LEGACY_REFRESH_KEY: &str = "refreshToken";

const EVENT_CAPACITY: usize = 16;

/// Access and refresh token pair.
///
/// Implements `Debug` manually to redact both tokens.
#[derive(Clone)]
pub struct AuthTokens {
    /// Bearer token attached to requests.
    pub access: SecretString,
    /// Token exchanged for a new access token when the backend returns 401.
    pub refresh: Option<SecretString>,
}

impl AuthTokens {
    /// Build a token pair.
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: refresh.map(SecretString::from),
        }
    }
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access", &"[REDACTED]")
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// On-disk shape of [`AuthTokens`].
#[derive(Serialize, Deserialize)]
struct StoredTokens {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Authentication state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Session transitions, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established by login or restored from storage.
    LoggedIn { username: String },
    /// The user logged out.
    LoggedOut,
    /// The session was discarded because its tokens could not be refreshed.
    Expired,
    /// The access token was replaced by a refresh.
    TokensRefreshed,
    /// The user profile changed.
    ProfileUpdated,
}

#[derive(Default)]
struct Session {
    tokens: Option<AuthTokens>,
    user: Option<UserProfile>,
}

impl Session {
    const fn state(&self) -> AuthState {
        if self.tokens.is_some() && self.user.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }
}

/// Shared handle to the current session.
///
/// Cloning is cheap; all clones observe the same session. Operations never
/// fail: storage problems are logged and the in-memory state stays
/// authoritative for the life of the process.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn KeyValueStore>,
    session: RwLock<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create an anonymous store persisting into `storage`.
    ///
    /// Call [`check_auth_status`](Self::check_auth_status) to restore a
    /// previous session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                session: RwLock::new(Session::default()),
                events,
            }),
        }
    }

    /// Create a store that only lives in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Establish a session for `user` and persist it.
    ///
    /// An empty access token leaves the store anonymous.
    pub fn login(&self, user: UserProfile, tokens: AuthTokens) {
        if tokens.access.expose_secret().is_empty() {
            tracing::warn!("Login called without an access token, staying anonymous");
            self.logout();
            return;
        }

        let username = user.username.clone();
        {
            // Storage is written under the lock so a concurrent refresh
            // cannot interleave its tokens with this user.
            let mut session = self.write();
            self.persist_tokens(&tokens);
            self.persist_user(&user);
            self.inner.storage.remove(LEGACY_ACCESS_KEY);
            self.inner.storage.remove(LEGACY_REFRESH_KEY);
            session.tokens = Some(tokens);
            session.user = Some(user);
        }

        tracing::info!(username = %username, "Session established");
        self.emit(SessionEvent::LoggedIn { username });
    }

    /// Clear the session in memory and in storage.
    ///
    /// Safe to call in any state.
    pub fn logout(&self) {
        let was = self.clear();
        if was == AuthState::Authenticated {
            tracing::info!("Logged out");
            self.emit(SessionEvent::LoggedOut);
        }
    }

    /// Restore the session from storage.
    ///
    /// Succeeds when both a user record and an access token are stored. The
    /// token is not validated; the first request that gets a 401 will.
    /// Anything less than a complete session is discarded.
    pub fn check_auth_status(&self) -> AuthState {
        let storage = &self.inner.storage;

        let tokens = self.load_tokens();
        let user = storage
            .get(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored user record is corrupt");
                    None
                }
            });

        match (tokens, user) {
            (Some(tokens), Some(user)) => {
                let username = user.username.clone();
                let was = {
                    let mut session = self.write();
                    let was = session.state();
                    session.tokens = Some(tokens);
                    session.user = Some(user);
                    was
                };
                tracing::debug!(username = %username, "Session restored from storage");
                if was == AuthState::Anonymous {
                    self.emit(SessionEvent::LoggedIn { username });
                }
                AuthState::Authenticated
            }
            _ => {
                self.logout();
                AuthState::Anonymous
            }
        }
    }

    /// Shallow-merge `partial` into the user profile, in memory and storage.
    ///
    /// Returns `false` and changes nothing when no one is logged in or the
    /// merge would produce an invalid profile.
    pub fn update_user(&self, partial: &Map<String, Value>) -> bool {
        let merged = {
            let mut session = self.write();
            let Some(current) = session.user.as_ref() else {
                return false;
            };
            let Some(merged) = current.merged(partial) else {
                tracing::warn!("Ignoring profile update that does not form a valid profile");
                return false;
            };
            session.user = Some(merged.clone());
            merged
        };

        self.persist_user(&merged);
        self.emit(SessionEvent::ProfileUpdated);
        true
    }

    /// Replace the access token after a successful refresh.
    ///
    /// `rejected` is the access token the refresh was started for. The new
    /// tokens are stored only while that token is still the current one, so
    /// a refresh that outlives its session never lands in a later one.
    /// `rotated_refresh` replaces the refresh token when the backend issued a
    /// new one. Returns `false` when nothing was stored.
    pub fn apply_refreshed_tokens(
        &self,
        rejected: &SecretString,
        access: SecretString,
        rotated_refresh: Option<SecretString>,
    ) -> bool {
        {
            let mut session = self.write();
            let Some(current) = session.tokens.as_mut() else {
                return false;
            };
            if current.access.expose_secret() != rejected.expose_secret() {
                tracing::debug!("Session changed during refresh, discarding new tokens");
                return false;
            }
            current.access = access;
            if let Some(refresh) = rotated_refresh {
                current.refresh = Some(refresh);
            }
            self.persist_tokens(current);
        }

        self.emit(SessionEvent::TokensRefreshed);
        true
    }

    /// Force the session closed after an unrecoverable refresh failure.
    ///
    /// Only the session whose access token was `rejected` is closed; a
    /// session established since then is left alone. Returns `true` and
    /// emits [`SessionEvent::Expired`] only if a session was closed.
    pub fn expire(&self, rejected: &SecretString) -> bool {
        let closed = self.clear_if(|session| {
            session
                .tokens
                .as_ref()
                .is_some_and(|tokens| tokens.access.expose_secret() == rejected.expose_secret())
        });
        if closed {
            tracing::warn!("Session expired");
            self.emit(SessionEvent::Expired);
        }
        closed
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current access token, if logged in.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().tokens.as_ref().map(|tokens| tokens.access.clone())
    }

    /// Current refresh token, if one was issued.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read()
            .tokens
            .as_ref()
            .and_then(|tokens| tokens.refresh.clone())
    }

    /// Current user profile, if logged in.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.read().state()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    /// Whether the current user may see admin features.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.read().user.as_ref().is_some_and(UserProfile::is_admin)
    }

    /// Subscribe to session transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Drop the session everywhere and report the state it was in.
    fn clear(&self) -> AuthState {
        let mut was = AuthState::Anonymous;
        self.clear_if(|session| {
            was = session.state();
            true
        });
        was
    }

    /// Drop the session everywhere if `matches` holds for it. Storage is
    /// cleared under the lock.
    fn clear_if(&self, matches: impl FnOnce(&Session) -> bool) -> bool {
        let mut session = self.write();
        if !matches(&session) {
            return false;
        }
        *session = Session::default();

        let storage = &self.inner.storage;
        for key in [TOKENS_KEY, USER_KEY, LEGACY_ACCESS_KEY, LEGACY_REFRESH_KEY] {
            storage.remove(key);
        }
        true
    }

    fn load_tokens(&self) -> Option<AuthTokens> {
        let storage = &self.inner.storage;

        if let Some(raw) = storage.get(TOKENS_KEY) {
            return match serde_json::from_str::<StoredTokens>(&raw) {
                Ok(stored) if !stored.access.is_empty() => {
                    Some(AuthTokens::new(stored.access, stored.refresh))
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored tokens are corrupt");
                    None
                }
            };
        }

        let access = storage
            .get(LEGACY_ACCESS_KEY)
            .filter(|access| !access.is_empty())?;
        let refresh = storage
            .get(LEGACY_REFRESH_KEY)
            .filter(|refresh| !refresh.is_empty());
        let tokens = AuthTokens::new(access, refresh);

        tracing::info!("Migrating legacy token storage");
        self.persist_tokens(&tokens);
        storage.remove(LEGACY_ACCESS_KEY);
        storage.remove(LEGACY_REFRESH_KEY);
        Some(tokens)
    }

    fn persist_tokens(&self, tokens: &AuthTokens) {
        let stored = StoredTokens {
            access: tokens.access.expose_secret().to_string(),
            refresh: tokens
                .refresh
                .as_ref()
                .map(|refresh| refresh.expose_secret().to_string()),
        };
        match serde_json::to_string(&stored) {
            Ok(raw) => self.inner.storage.set(TOKENS_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode tokens"),
        }
    }

    fn persist_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => self.inner.storage.set(USER_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode user profile"),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.read();
        f.debug_struct("SessionStore")
            .field("state", &session.state())
            .field(
                "username",
                &session.user.as_ref().map(|user| user.username.as_str()),
            )
            .finish_non_exhaustive()
    }
}
