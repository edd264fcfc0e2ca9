//! API gateway: the only component that talks to the backend.
//!
//! # Request pipeline
//!
//! 1. Resolve `{base_url}/api{endpoint}` and append query parameters.
//! 2. Attach `Authorization: Bearer <access>` when the session holds a token.
//! 3. On a 401 for a request that carried a token, refresh the token once
//!    (shared by every request that hit the same 401 cascade) and retry the
//!    request once with the new token. If the refresh fails the session is
//!    expired and every affected request fails with [`ApiError::AuthExpired`].
//! 4. Classify everything else into [`ApiError`].
//!
//! There is no other retry and no backoff.

mod refresh;
pub mod request;

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::SessionStore;
use refresh::{RefreshCoordinator, RefreshFailure, Role};
pub use request::{ApiRequest, ApiResponse, RequestBody};

/// Token refresh endpoint, relative to `/api`.
pub const REFRESH_ENDPOINT: &str = "/auth/token/refresh/";

/// Client for the Smart Parking backend.
///
/// Cloning is cheap and clones share the HTTP connection pool, the session,
/// and the refresh queue, so one client can serve any number of concurrent
/// tasks.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    refresh: RefreshCoordinator,
}

/// Body returned by the refresh endpoint.
#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Why a refresh attempt did not produce a token. Only used for logging;
/// callers see [`ApiError::AuthExpired`].
#[derive(Debug)]
enum RefreshError {
    NoRefreshToken,
    Transport(reqwest::Error),
    Rejected(StatusCode),
    InvalidBody(String),
    SessionClosed,
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRefreshToken => f.write_str("no refresh token"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Rejected(status) => write!(f, "rejected with {status}"),
            Self::InvalidBody(e) => write!(f, "invalid body: {e}"),
            Self::SessionClosed => f.write_str("session closed during refresh"),
        }
    }
}

impl ApiClient {
    /// Create a client for `config.base_url` bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http: builder.build()?,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                session,
                refresh: RefreshCoordinator::default(),
            }),
        })
    }

    /// The session this client reads tokens from.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Backend origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL for an endpoint relative to `/api`.
    #[must_use]
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}/api{endpoint}", self.inner.base_url)
        } else {
            format!("{}/api/{endpoint}", self.inner.base_url)
        }
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Send a request through the pipeline described in the module docs.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for any non-2xx outcome or
    /// transport failure.
    #[instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = if request.authenticated {
            self.inner.session.access_token()
        } else {
            None
        };

        let response = self.send(&request, token.as_ref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(rejected) = token
        {
            tracing::debug!("Access token rejected, coordinating refresh");
            return self.recover_unauthorized(&request, &rejected).await;
        }

        Self::into_result(response).await
    }

    /// GET and decode.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request); also `InvalidResponse` on a body of
    /// the wrong shape.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(ApiRequest::get(endpoint)).await?.decode()
    }

    /// POST a JSON body and decode the response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::post(endpoint).json(body)?)
            .await?
            .decode()
    }

    /// PUT a JSON body and decode the response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::put(endpoint).json(body)?)
            .await?
            .decode()
    }

    /// PATCH a JSON body and decode the response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn patch_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(ApiRequest::patch(endpoint).json(body)?)
            .await?
            .decode()
    }

    /// DELETE, returning whatever body the backend sent.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        self.request(ApiRequest::delete(endpoint)).await
    }

    /// Handle a 401 on a request that carried `rejected`.
    async fn recover_unauthorized(
        &self,
        request: &ApiRequest,
        rejected: &SecretString,
    ) -> Result<ApiResponse, ApiError> {
        let session = &self.inner.session;

        match self.inner.refresh.join(rejected, || session.access_token()) {
            Role::Retry(token) => {
                tracing::debug!("Token was refreshed meanwhile, retrying");
                self.retry(request, &token).await
            }
            Role::Waiter(rx) => match rx.await {
                Ok(Ok(token)) => self.retry(request, &token).await,
                Ok(Err(RefreshFailure::Expired)) => Err(ApiError::AuthExpired),
                Ok(Err(RefreshFailure::Superseded)) => Err(superseded()),
                Ok(Err(RefreshFailure::Abandoned)) | Err(_) => Err(ApiError::NetworkError(
                    "token refresh was interrupted".to_string(),
                )),
            },
            Role::Refresher(guard) => match self.refresh_access_token(rejected).await {
                Ok(token) => {
                    guard.settle(&Ok(token.clone()));
                    self.retry(request, &token).await
                }
                Err(e) => {
                    let failure = if session.expire(rejected) {
                        tracing::warn!(reason = %e, "Token refresh failed, ending session");
                        RefreshFailure::Expired
                    } else if session.is_authenticated() {
                        tracing::info!(reason = %e, "Session replaced during token refresh");
                        RefreshFailure::Superseded
                    } else {
                        RefreshFailure::Expired
                    };
                    guard.settle(&Err(failure));
                    match failure {
                        RefreshFailure::Superseded => Err(superseded()),
                        _ => Err(ApiError::AuthExpired),
                    }
                }
            },
        }
    }

    /// The single retry after a refresh. A second 401 is not refreshed again.
    async fn retry(
        &self,
        request: &ApiRequest,
        token: &SecretString,
    ) -> Result<ApiResponse, ApiError> {
        let response = self.send(request, Some(token)).await?;
        Self::into_result(response).await
    }

    /// Exchange the stored refresh token for a new access token and store it
    /// in the session that still holds `rejected`.
    #[instrument(skip_all)]
    async fn refresh_access_token(
        &self,
        rejected: &SecretString,
    ) -> Result<SecretString, RefreshError> {
        let session = &self.inner.session;
        let refresh = session
            .refresh_token()
            .ok_or(RefreshError::NoRefreshToken)?;

        let response = self
            .inner
            .http
            .post(self.url_for(REFRESH_ENDPOINT))
            .json(&serde_json::json!({ "refresh": refresh.expose_secret() }))
            .send()
            .await
            .map_err(RefreshError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidBody(e.to_string()))?;
        if body.access.is_empty() {
            return Err(RefreshError::InvalidBody("empty access token".to_string()));
        }

        let access = SecretString::from(body.access);
        if !session.apply_refreshed_tokens(
            rejected,
            access.clone(),
            body.refresh.map(SecretString::from),
        ) {
            return Err(RefreshError::SessionClosed);
        }

        tracing::info!("Access token refreshed");
        Ok(access)
    }

    /// Issue one HTTP call.
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut url = Url::parse(&self.url_for(&request.endpoint))
            .map_err(|e| ApiError::NetworkError(format!("invalid URL: {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }

        let mut builder = self.inner.http.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Raw {
                bytes,
                content_type,
            }) => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
            None => builder,
        };

        builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request did not reach the backend");
            ApiError::from(e)
        })
    }

    /// Turn a response (other than a recoverable 401) into the result.
    async fn into_result(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(ApiResponse::NoContent);
            }
            return serde_json::from_slice(&bytes)
                .map(ApiResponse::Json)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()));
        }

        let body: Option<Value> = serde_json::from_slice(&bytes).ok();
        let message = error_message(status, body.as_ref());
        tracing::warn!(status = %status, message = %message, "Request failed");

        Err(classify(status, message, body))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

/// Map a non-2xx status to the error taxonomy.
fn classify(status: StatusCode, message: String, body: Option<Value>) -> ApiError {
    match status {
        StatusCode::FORBIDDEN => ApiError::Forbidden { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        s if s.is_server_error() => ApiError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => ApiError::RequestFailed {
            status: s.as_u16(),
            message,
            body,
        },
    }
}

/// The original 401 of a request whose session was replaced by a new login
/// while its token was being refreshed. Not a reason to send anyone to login.
fn superseded() -> ApiError {
    ApiError::RequestFailed {
        status: 401,
        message: "Session changed while the token was being refreshed".to_string(),
        body: None,
    }
}

/// Best human-readable message: the body's `detail`, `message` or `error`
/// string, else the status reason phrase, else `HTTP <code>`.
fn error_message(status: StatusCode, body: Option<&Value>) -> String {
    body.and_then(|body| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    })
    .or_else(|| status.canonical_reason().map(str::to_string))
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig::new(base).unwrap();
        ApiClient::new(&config, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_for() {
        let client = client("http://localhost:8000/");
        assert_eq!(
            client.url_for("/slots/available/"),
            "http://localhost:8000/api/slots/available/"
        );
        assert_eq!(
            client.url_for("slots/"),
            "http://localhost:8000/api/slots/"
        );
    }

    #[test]
    fn test_error_message_priority() {
        let body = json!({"detail": "Given token not valid", "error": "other"});
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, Some(&body)),
            "Given token not valid"
        );

        let body = json!({"error": "Parking slot is not available"});
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, Some(&body)),
            "Parking slot is not available"
        );

        let body = json!({"username": ["taken"]});
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, Some(&body)),
            "Bad Request"
        );

        assert_eq!(
            error_message(StatusCode::from_u16(599).unwrap(), None),
            "HTTP 599"
        );
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, String::new(), None),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, String::new(), None),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, String::new(), None),
            ApiError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, String::new(), None),
            ApiError::RequestFailed { status: 401, .. }
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, String::new(), Some(json!({}))),
            ApiError::RequestFailed {
                status: 409,
                body: Some(_),
                ..
            }
        ));
    }
}
