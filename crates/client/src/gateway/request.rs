//! Request and response values passed through the gateway.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Sent verbatim.
    Raw {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// A request relative to the backend's `/api` root.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) endpoint: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) authenticated: bool,
}

impl ApiRequest {
    /// Build a request. A missing leading `/` on `endpoint` is added.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.starts_with('/') {
            endpoint
        } else {
            format!("/{endpoint}")
        };

        Self {
            method,
            endpoint,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    #[must_use]
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    #[must_use]
    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Encode` if `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Attach a body that is sent as-is.
    #[must_use]
    pub fn raw(mut self, bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw {
            bytes: bytes.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Never attach the session's bearer token.
    ///
    /// Used for the credential endpoints, where a stale token must not turn
    /// a rejected password into a refresh attempt.
    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.authenticated = false;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// A 2xx response with a JSON body.
    Json(Value),
    /// A 204, or a 2xx with an empty body.
    NoContent,
}

impl ApiResponse {
    /// The JSON body, if there was one.
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::NoContent => None,
        }
    }

    /// Decode the body into `T`. An empty body decodes as JSON `null`, so
    /// `Option<T>` and `()` targets accept it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidResponse` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = self.into_json().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_leading_slash_added() {
        assert_eq!(ApiRequest::get("slots/").endpoint(), "/slots/");
        assert_eq!(ApiRequest::get("/slots/").endpoint(), "/slots/");
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/auth/token/refresh/")
            .json(&json!({"refresh": "r1"}))
            .unwrap();
        assert_eq!(
            request.body,
            Some(RequestBody::Json(json!({"refresh": "r1"})))
        );
        assert!(request.authenticated);
        assert!(!request.without_auth().authenticated);
    }

    #[test]
    fn test_decode_no_content() {
        let unit: Option<Value> = ApiResponse::NoContent.decode().unwrap();
        assert!(unit.is_none());

        let err = ApiResponse::NoContent.decode::<Vec<i64>>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_decode_json() {
        let ids: Vec<i64> = ApiResponse::Json(json!([1, 2])).decode().unwrap();
        assert_eq!(ids, vec![1, 2]);
    }
}
