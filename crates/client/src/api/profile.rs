use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use smart_parking_core::{Booking, UserProfile};
use tracing::instrument;

use crate::error::ApiError;
use crate::gateway::ApiClient;

/// Body of `GET /user/profile/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileOverview {
    pub user: UserProfile,
    #[serde(default)]
    pub stats: ProfileStats,
    #[serde(default)]
    pub recent_bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileStats {
    pub total_bookings: u32,
    pub active_bookings: u32,
    pub completed_bookings: u32,
    pub total_spent: Decimal,
}

impl ApiClient {
    /// The logged-in user's record and booking statistics.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<ProfileOverview, ApiError> {
        self.get_json("/user/profile/").await
    }

    /// Update profile fields and merge the result into the session user.
    ///
    /// The backend's `user` object is merged when present, otherwise the
    /// submitted fields are.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error; the session is left untouched.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, changes: &Map<String, Value>) -> Result<Value, ApiError> {
        let response: Value = self.put_json("/user/profile/", changes).await?;

        let merged = match response.get("user").and_then(Value::as_object) {
            Some(user) => self.session().update_user(user),
            None => self.session().update_user(changes),
        };
        if !merged {
            tracing::debug!("Profile updated but session user was not");
        }

        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_overview_decodes() {
        let overview: ProfileOverview = serde_json::from_value(json!({
            "user": {"id": 4, "username": "driver", "email": "d@example.com", "is_staff": false, "is_superuser": false},
            "stats": {"total_bookings": 3, "active_bookings": 1, "completed_bookings": 2, "total_spent": 85.5},
            "recent_bookings": []
        }))
        .unwrap();
        assert_eq!(overview.user.username, "driver");
        assert_eq!(overview.stats.completed_bookings, 2);
        assert_eq!(overview.stats.total_spent, Decimal::new(855, 1));
    }

    #[test]
    fn test_missing_stats_default() {
        let overview: ProfileOverview =
            serde_json::from_value(json!({"user": {"username": "driver"}})).unwrap();
        assert_eq!(overview.stats, ProfileStats::default());
    }
}
