//! Admin surface. The backend enforces authorization; these are plain
//! typed calls.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use smart_parking_core::{Booking, BookingId, ParkingSlot, SlotId, SlotInput, SlotStatus};
use tracing::instrument;

use crate::error::ApiError;
use crate::fallback::{Fetched, demo_slots, with_demo_fallback};
use crate::gateway::ApiClient;

/// Default maintenance window for [`ApiClient::change_slot_status`].
pub const DEFAULT_MAINTENANCE_HOURS: u32 = 24;

/// Response of the slot create, update and status endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlotMutation {
    #[serde(default)]
    pub message: String,
    pub slot: ParkingSlot,
    /// Set when the backend could not persist the slot and echoed a sample.
    #[serde(default)]
    pub is_demo: bool,
}

/// Body of `GET /admin/dashboard/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdminDashboard {
    #[serde(default)]
    pub slot_stats: SlotStats,
    #[serde(default)]
    pub booking_stats: BookingStats,
    #[serde(default)]
    pub revenue_stats: RevenueStats,
    #[serde(default)]
    pub recent_bookings: Vec<Booking>,
    #[serde(default)]
    pub popular_slots: Vec<ParkingSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlotStats {
    pub total: u32,
    pub available: u32,
    pub occupied: u32,
    pub maintenance: u32,
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingStats {
    pub total: u32,
    pub active: u32,
    pub completed: u32,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RevenueStats {
    pub total_revenue: Decimal,
    pub today_revenue: Decimal,
    pub average_booking_value: Decimal,
}

impl ApiClient {
    /// Every slot, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, otherwise the classified gateway
    /// error.
    #[instrument(skip(self))]
    pub async fn admin_slots(&self) -> Result<Vec<ParkingSlot>, ApiError> {
        self.get_json("/admin/slots/").await
    }

    /// Admin slot list, or the demo set when the backend is down.
    ///
    /// # Errors
    ///
    /// Errors other than network and server failures are returned as-is.
    pub async fn admin_slots_or_demo(&self) -> Result<Fetched<Vec<ParkingSlot>>, ApiError> {
        with_demo_fallback(self.admin_slots().await, demo_slots)
    }

    /// Create a slot.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` for duplicate slot numbers or missing fields.
    #[instrument(skip(self, input))]
    pub async fn create_slot(&self, input: &SlotInput) -> Result<SlotMutation, ApiError> {
        let mutation: SlotMutation = self.post_json("/admin/slots/create/", input).await?;
        Ok(mark_demo(mutation))
    }

    /// Update the fields set in `input`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID, otherwise the classified
    /// gateway error.
    #[instrument(skip(self, input))]
    pub async fn update_slot(
        &self,
        id: SlotId,
        input: &SlotInput,
    ) -> Result<SlotMutation, ApiError> {
        let mutation: SlotMutation = self
            .put_json(&format!("/admin/slots/{id}/update/"), input)
            .await?;
        Ok(mark_demo(mutation))
    }

    /// Delete a slot.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the slot has an active booking.
    #[instrument(skip(self))]
    pub async fn delete_slot(&self, id: SlotId) -> Result<(), ApiError> {
        self.delete(&format!("/admin/slots/{id}/delete/")).await?;
        Ok(())
    }

    /// Change a slot's status. `duration_hours` only matters for
    /// maintenance and defaults to [`DEFAULT_MAINTENANCE_HOURS`].
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn change_slot_status(
        &self,
        id: SlotId,
        status: SlotStatus,
        duration_hours: Option<u32>,
    ) -> Result<SlotMutation, ApiError> {
        self.post_json(
            &format!("/admin/slots/{id}/status/"),
            &json!({
                "status": status,
                "duration_hours": duration_hours.unwrap_or(DEFAULT_MAINTENANCE_HOURS),
            }),
        )
        .await
    }

    /// Occupancy, booking and revenue statistics.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, otherwise the classified gateway
    /// error.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<AdminDashboard, ApiError> {
        self.get_json("/admin/dashboard/").await
    }

    /// Every booking in the system.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn admin_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get_json("/admin/bookings/").await
    }

    /// Patch a booking as an admin.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self, changes))]
    pub async fn update_admin_booking(
        &self,
        id: BookingId,
        changes: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.patch_json(&format!("/admin/bookings/{id}/"), changes)
            .await
    }

    /// Registered users, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn admin_users(&self) -> Result<Value, ApiError> {
        self.get_json("/admin/users/").await
    }

    /// Revenue and usage reports, as returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn admin_reports(&self) -> Result<Value, ApiError> {
        self.get_json("/admin/reports/").await
    }
}

/// Carry a response-level demo flag onto the slot itself.
fn mark_demo(mut mutation: SlotMutation) -> SlotMutation {
    if mutation.is_demo {
        mutation.slot.is_demo = true;
    }
    mutation
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_response_marks_slot() {
        let mutation: SlotMutation = serde_json::from_value(json!({
            "message": "Parking slot created successfully (Demo Mode)",
            "slot": {"id": 1760000000, "slot_number": "G-Z-999"},
            "is_demo": true
        }))
        .unwrap();
        assert!(mark_demo(mutation).slot.is_demo);
    }

    #[test]
    fn test_dashboard_decodes_float_revenue() {
        let dashboard: AdminDashboard = serde_json::from_value(json!({
            "slot_stats": {"total": 10, "available": 6, "occupied": 3, "maintenance": 1, "utilization_rate": 30.0},
            "booking_stats": {"total": 4, "active": 1, "completed": 2, "completion_rate": 50.0},
            "revenue_stats": {"total_revenue": 120.5, "today_revenue": 0, "average_booking_value": 60.25},
            "recent_bookings": [],
            "popular_slots": []
        }))
        .unwrap();
        assert_eq!(dashboard.slot_stats.maintenance, 1);
        assert_eq!(
            dashboard.revenue_stats.average_booking_value,
            Decimal::new(6025, 2)
        );
    }
}
