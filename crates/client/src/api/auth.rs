//! Authentication endpoints and login response normalization.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smart_parking_core::{Email, UserProfile};
use tracing::instrument;

use crate::error::{ApiError, FieldErrors};
use crate::gateway::{ApiClient, ApiRequest};
use crate::session::AuthTokens;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Login response shapes the backend has used.
///
/// Variants are tried in order; anything that matches none of them is
/// rejected rather than guessed at.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoginResponse {
    /// `{user, tokens: {access, refresh}}`
    Nested { user: UserProfile, tokens: TokenPair },
    /// `{access, refresh?, user?}`
    Flat {
        access: String,
        #[serde(default)]
        refresh: Option<String>,
        #[serde(default)]
        user: Option<UserProfile>,
    },
    /// `{token}`
    Legacy { token: String },
}

#[derive(Deserialize)]
struct TokenPair {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl LoginResponse {
    /// Reduce to one `(user, tokens)` pair. Shapes without a user record get
    /// a minimal non-admin profile for `username`.
    fn normalize(self, username: &str) -> Result<(UserProfile, AuthTokens), ApiError> {
        let (user, access, refresh) = match self {
            Self::Nested { user, tokens } => (Some(user), tokens.access, tokens.refresh),
            Self::Flat {
                access,
                refresh,
                user,
            } => (user, access, refresh),
            Self::Legacy { token } => (None, token, None),
        };

        if access.is_empty() {
            return Err(ApiError::InvalidResponse(
                "login response contained an empty access token".to_string(),
            ));
        }

        let user = user.unwrap_or_else(|| UserProfile::minimal(username));
        Ok((user, AuthTokens::new(access, refresh.filter(|r| !r.is_empty()))))
    }
}

/// Parse a login response body.
///
/// # Errors
///
/// Returns `ApiError::InvalidResponse` for unrecognized shapes.
pub fn normalize_login_response(
    body: Value,
    username: &str,
) -> Result<(UserProfile, AuthTokens), ApiError> {
    let response: LoginResponse = serde_json::from_value(body).map_err(|_| {
        ApiError::InvalidResponse("unrecognized login response".to_string())
    })?;
    response.normalize(username)
}

/// Sign-up form.
///
/// Implements `Debug` manually to redact the passwords.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("password_confirmation", &"[REDACTED]")
            .finish()
    }
}

impl Registration {
    /// Check the form locally, collecting every problem.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` keyed by field name.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        let mut reject = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        if self.username.trim().is_empty() {
            reject("username", "Username is required".to_string());
        }
        if self.email.trim().is_empty() {
            reject("email", "Email is required".to_string());
        } else if let Err(e) = Email::parse(self.email.trim()) {
            reject("email", format!("Invalid email: {e}"));
        }

        let password = self.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            reject(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
        if password != self.password_confirmation.expose_secret() {
            reject("password_confirmation", "Passwords do not match".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Result of [`ApiClient::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub backend_url: String,
    /// The health endpoint's `status` field, when reachable.
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Body of `GET /health/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ApiClient {
    /// Log in and establish the session.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` (401) for bad credentials, or
    /// `InvalidResponse` if the backend answers with an unknown shape.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::post("/auth/login/")
            .without_auth()
            .json(&LoginRequest {
                username,
                password: password.expose_secret(),
            })?;

        let body = self
            .request(request)
            .await?
            .into_json()
            .ok_or_else(|| ApiError::InvalidResponse("empty login response".to_string()))?;

        let (user, tokens) = normalize_login_response(body, username)?;
        self.session().login(user.clone(), tokens);
        Ok(user)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without contacting the backend if the form is
    /// invalid; otherwise the backend's `RequestFailed` with field errors in
    /// its body.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
        registration.validate()?;

        let request = ApiRequest::post("/auth/register/")
            .without_auth()
            .json(&RegisterRequest {
                username: registration.username.trim(),
                email: registration.email.trim(),
                password: registration.password.expose_secret(),
            })?;

        Ok(self
            .request(request)
            .await?
            .into_json()
            .unwrap_or(Value::Null))
    }

    /// Log out. The local session is cleared whatever the backend says.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.session().is_authenticated()
            && let Err(e) = self.request(ApiRequest::post("/auth/logout/")).await
        {
            tracing::debug!(error = %e, "Backend logout failed, clearing session anyway");
        }
        self.session().logout();
    }

    /// Liveness probe.
    ///
    /// # Errors
    ///
    /// Returns the classified error if the backend is unreachable or
    /// unhealthy.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.request(ApiRequest::get("/health/").without_auth())
            .await?
            .decode()
    }

    /// Connectivity diagnostics. Never fails.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectionStatus {
        let backend_url = self.base_url().to_string();
        match self.health().await {
            Ok(health) => ConnectionStatus {
                connected: true,
                backend_url,
                status: Some(health.status),
                error: None,
            },
            Err(e) => ConnectionStatus {
                connected: false,
                backend_url,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}
