//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PARKING_API_URL` - Backend origin; `/api` is appended per request
//!   (default: `http://localhost:8000`)
//! - `PARKING_SESSION_FILE` - Where the session is persisted
//!   (default: `.parking-session.json`)
//! - `PARKING_REQUEST_TIMEOUT_SECS` - Per-request deadline; unset means
//!   requests wait indefinitely

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_SESSION_FILE: &str = ".parking-session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Settings for [`crate::ApiClient`] and the session file.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin without the `/api` suffix and without a trailing slash
    pub base_url: String,
    /// Session persistence file
    pub session_file: PathBuf,
    /// Optional per-request deadline
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url("PARKING_API_URL", base_url)?,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = normalize_base_url(
            "PARKING_API_URL",
            &get_env_or_default("PARKING_API_URL", DEFAULT_API_URL),
        )?;
        let session_file =
            PathBuf::from(get_env_or_default("PARKING_SESSION_FILE", DEFAULT_SESSION_FILE));
        let request_timeout = get_optional_env("PARKING_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_timeout("PARKING_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?;

        Ok(Self {
            base_url,
            session_file,
            request_timeout,
        })
    }

    /// Set the per-request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the session persistence file.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate an http(s) origin and strip any trailing slash.
fn normalize_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not contain a query or fragment".to_string(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let config = ClientConfig::new("http://localhost:8000/").unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let config = ClientConfig::new("https://parking.example.com/backend/").unwrap();
        assert_eq!(config.base_url, "https://parking.example.com/backend");
    }

    #[test]
    fn test_base_url_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::new("localhost:8000"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(ClientConfig::new("ftp://example.com").is_err());
        assert!(ClientConfig::new("http://example.com/?x=1").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(
            parse_timeout("T", " 15 ").unwrap(),
            Duration::from_secs(15)
        );
        assert!(parse_timeout("T", "0").is_err());
        assert!(parse_timeout("T", "soon").is_err());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("http://localhost:8000")
            .unwrap()
            .with_request_timeout(Duration::from_secs(5))
            .with_session_file("/tmp/session.json");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
    }
}
