//! Error taxonomy surfaced by the API client.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Field-keyed validation messages, as returned by the backend's serializers
/// (`{"username": ["A user with that username already exists."]}`).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session could not be refreshed; the store is now anonymous and
    /// the caller should send the user back to login.
    #[error("Session expired, please log in again")]
    AuthExpired,

    /// HTTP 403.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// HTTP 404.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 5xx.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// The request never produced an HTTP response (DNS, connect, reset,
    /// timeout).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Any other non-2xx status. `body` carries the decoded error body, if
    /// it was JSON, so field-level validation errors reach the caller.
    #[error("Request failed ({status}): {message}")]
    RequestFailed {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Input rejected locally before any request was sent.
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(FieldErrors),

    /// A request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether a read screen may substitute demo data for this failure.
    #[must_use]
    pub const fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::ServerError { .. })
    }

    /// Whether the caller should route the user to the login screen.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// HTTP status behind this error, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::ServerError { status, .. } | Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Per-field validation messages, from local validation or from a
    /// field-keyed error body.
    ///
    /// Returns `None` when the error carries no field-level detail.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::RequestFailed {
                body: Some(Value::Object(map)),
                ..
            } => {
                let errors: FieldErrors = map
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "detail" | "message" | "error"))
                    .filter_map(|(key, value)| {
                        let messages = match value {
                            Value::String(message) => vec![message.clone()],
                            Value::Array(items) => items
                                .iter()
                                .filter_map(|item| item.as_str().map(str::to_string))
                                .collect(),
                            _ => return None,
                        };
                        (!messages.is_empty()).then(|| (key.clone(), messages))
                    })
                    .collect();
                (!errors.is_empty()).then_some(errors)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

fn format_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_fallback_eligibility() {
        assert!(ApiError::NetworkError("connection refused".into()).is_fallback_eligible());
        assert!(
            ApiError::ServerError {
                status: 503,
                message: "Service Unavailable".into()
            }
            .is_fallback_eligible()
        );
        assert!(!ApiError::AuthExpired.is_fallback_eligible());
        assert!(
            !ApiError::NotFound {
                message: "gone".into()
            }
            .is_fallback_eligible()
        );
    }

    #[test]
    fn test_field_errors_from_body() {
        let err = ApiError::RequestFailed {
            status: 400,
            message: "Bad Request".into(),
            body: Some(json!({
                "username": ["A user with that username already exists."],
                "email": "Enter a valid email address.",
                "error": "ignored"
            })),
        };

        let fields = err.field_errors().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields["username"],
            vec!["A user with that username already exists."]
        );
        assert_eq!(fields["email"], vec!["Enter a valid email address."]);
    }

    #[test]
    fn test_field_errors_absent_for_plain_message() {
        let err = ApiError::RequestFailed {
            status: 400,
            message: "Payment already processed".into(),
            body: Some(json!({"error": "Payment already processed"})),
        };
        assert!(err.field_errors().is_none());
        assert!(ApiError::AuthExpired.field_errors().is_none());
    }

    #[test]
    fn test_validation_display() {
        let mut errors = FieldErrors::new();
        errors.insert("password".into(), vec!["Too short.".into()]);
        let err = ApiError::Validation(errors);
        assert_eq!(err.to_string(), "Validation failed: password: Too short.");
    }

    #[test]
    fn test_status() {
        assert_eq!(
            ApiError::Forbidden {
                message: String::new()
            }
            .status(),
            Some(403)
        );
        assert_eq!(ApiError::AuthExpired.status(), None);
    }
}
