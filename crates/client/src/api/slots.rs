//! Public slot inventory.

use serde::Deserialize;
use smart_parking_core::{ParkingSlot, ParkingSummary, SlotId};
use tracing::instrument;

use crate::error::ApiError;
use crate::fallback::{Fetched, demo_available_slots, demo_summary, with_demo_fallback};
use crate::gateway::ApiClient;

/// Body of `GET /parking/info/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParkingInfo {
    pub total_slots: u32,
    pub available_slots: u32,
    /// Percentage of active slots that are available.
    #[serde(default)]
    pub occupancy_rate: f64,
    #[serde(default)]
    pub slots_by_type: Vec<SlotTypeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlotTypeCount {
    pub slot_type: String,
    pub count: u32,
}

impl ApiClient {
    /// Every slot.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn slots(&self) -> Result<Vec<ParkingSlot>, ApiError> {
        self.get_json("/slots/").await
    }

    /// Slots that can be booked now.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn available_slots(&self) -> Result<Vec<ParkingSlot>, ApiError> {
        self.get_json("/slots/available/").await
    }

    /// One slot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID, otherwise the classified
    /// gateway error.
    #[instrument(skip(self))]
    pub async fn slot(&self, id: SlotId) -> Result<ParkingSlot, ApiError> {
        self.get_json(&format!("/slots/{id}/")).await
    }

    /// Available slots, or the demo set when the backend is down.
    ///
    /// # Errors
    ///
    /// Errors other than network and server failures are returned as-is.
    pub async fn available_slots_or_demo(&self) -> Result<Fetched<Vec<ParkingSlot>>, ApiError> {
        with_demo_fallback(self.available_slots().await, demo_available_slots)
    }

    /// Aggregate occupancy from the public info endpoint.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn parking_info(&self) -> Result<ParkingInfo, ApiError> {
        self.get_json("/parking/info/").await
    }

    /// Occupancy computed from the full slot list, or the demo figures when
    /// the backend is down.
    ///
    /// # Errors
    ///
    /// Errors other than network and server failures are returned as-is.
    pub async fn parking_summary_or_demo(&self) -> Result<Fetched<ParkingSummary>, ApiError> {
        let summary = self
            .slots()
            .await
            .map(|slots| ParkingSummary::from_slots(&slots));
        with_demo_fallback(summary, demo_summary)
    }
}
