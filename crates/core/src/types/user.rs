//! Authenticated user profile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::UserId;

/// Profile of the logged-in user as returned by the backend.
///
/// Fields the client does not interpret (names, phone numbers, booking
/// counters) are kept in `extra` so they survive a round trip through
/// persistence and shallow profile merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user ID. Absent when the profile was synthesized locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    /// Login name.
    pub username: String,
    /// Email address as stored by the backend (may be empty).
    #[serde(default)]
    pub email: String,
    /// Django staff flag.
    #[serde(default)]
    pub is_staff: bool,
    /// Django superuser flag.
    #[serde(default)]
    pub is_superuser: bool,
    /// Optional application role (e.g. `"admin"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Any other profile fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Build the minimal profile used when a login response carries tokens
    /// but no user record.
    #[must_use]
    pub fn minimal(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: String::new(),
            is_staff: false,
            is_superuser: false,
            role: None,
            extra: Map::new(),
        }
    }

    /// Whether this user may see the admin surface.
    ///
    /// The server remains authoritative; this only decides what to offer.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser || self.role.as_deref() == Some("admin")
    }

    /// Shallow-merge `partial` into this profile.
    ///
    /// Top-level keys in `partial` replace the existing values. Returns
    /// `None` if the merged object no longer forms a valid profile (for
    /// example a non-string `username`), leaving the caller's copy untouched.
    #[must_use]
    pub fn merged(&self, partial: &Map<String, Value>) -> Option<Self> {
        let Ok(Value::Object(mut fields)) = serde_json::to_value(self) else {
            return None;
        };
        for (key, value) in partial {
            fields.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(fields)).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn driver() -> UserProfile {
        serde_json::from_value(json!({
            "id": 7,
            "username": "driver",
            "email": "driver@example.com",
            "is_staff": false,
            "is_superuser": false,
            "first_name": "Dana"
        }))
        .unwrap()
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let user = driver();
        assert_eq!(user.extra.get("first_name"), Some(&json!("Dana")));

        let round_trip = serde_json::to_value(&user).unwrap();
        assert_eq!(round_trip["first_name"], "Dana");
        assert_eq!(round_trip["id"], 7);
    }

    #[test]
    fn test_is_admin() {
        let mut user = driver();
        assert!(!user.is_admin());

        user.is_staff = true;
        assert!(user.is_admin());

        let mut user = driver();
        user.is_superuser = true;
        assert!(user.is_admin());

        let mut user = driver();
        user.role = Some("admin".to_string());
        assert!(user.is_admin());

        user.role = Some("driver".to_string());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_merged_replaces_top_level_keys() {
        let user = driver();
        let partial = json!({"email": "new@example.com", "phone": "555-0100"});
        let merged = user.merged(partial.as_object().unwrap()).unwrap();

        assert_eq!(merged.email, "new@example.com");
        assert_eq!(merged.username, "driver");
        assert_eq!(merged.extra.get("phone"), Some(&json!("555-0100")));
        assert_eq!(merged.extra.get("first_name"), Some(&json!("Dana")));
    }

    #[test]
    fn test_merged_rejects_invalid_profile() {
        let user = driver();
        let partial = json!({"username": 12});
        assert!(user.merged(partial.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_minimal_profile() {
        let user = UserProfile::minimal("walk_in");
        assert_eq!(user.username, "walk_in");
        assert!(user.id.is_none());
        assert!(!user.is_admin());
    }
}
