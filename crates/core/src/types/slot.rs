//! Parking slot records and derived occupancy summaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::SlotId;
use super::status::{SlotSize, SlotStatus, SlotType};

/// A parking slot as listed by the backend.
///
/// The list endpoints return a reduced field set, so everything beyond the
/// identifying fields and rates is optional or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSlot {
    pub id: SlotId,
    /// Human-facing slot code, e.g. `G-A-101`.
    pub slot_number: String,
    /// Floor code: `B1`, `G`, `1`, `2` or `3`.
    #[serde(default = "default_floor")]
    pub floor: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub slot_type: SlotType,
    #[serde(default)]
    pub slot_size: SlotSize,
    #[serde(default)]
    pub status: SlotStatus,
    #[serde(default)]
    pub base_rate_per_hour: Decimal,
    #[serde(default)]
    pub premium_rate_per_hour: Decimal,
    /// Server-computed sum of the two rates; absent on some endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rate_per_hour: Option<Decimal>,
    #[serde(default)]
    pub is_ev_charging: bool,
    #[serde(default)]
    pub is_handicap_accessible: bool,
    #[serde(default)]
    pub is_covered: bool,
    #[serde(default)]
    pub has_security_camera: bool,
    #[serde(default)]
    pub features_list: Vec<String>,
    #[serde(default)]
    pub location_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Set only on locally fabricated records; live data never carries it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_demo: bool,
}

fn default_floor() -> String {
    "G".to_string()
}

const fn default_true() -> bool {
    true
}

impl ParkingSlot {
    /// Hourly rate including any premium.
    #[must_use]
    pub fn total_rate(&self) -> Decimal {
        self.total_rate_per_hour
            .unwrap_or(self.base_rate_per_hour + self.premium_rate_per_hour)
    }

    /// Whether the slot can be booked right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.is_active && self.status == SlotStatus::Available
    }

    /// Feature labels, derived from the feature flags when the server did
    /// not send a list.
    #[must_use]
    pub fn features(&self) -> Vec<String> {
        if !self.features_list.is_empty() {
            return self.features_list.clone();
        }

        [
            (self.is_ev_charging, "EV Charging"),
            (self.is_handicap_accessible, "Handicap Accessible"),
            (self.is_covered, "Covered"),
            (self.has_security_camera, "Security Camera"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, label)| label.to_string())
        .collect()
    }
}

/// Fields accepted by the admin slot create/update endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_type: Option<SlotType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_size: Option<SlotSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SlotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_rate_per_hour: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_rate_per_hour: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ev_charging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_handicap_accessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_covered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_security_camera: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Occupancy counts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSummary {
    pub total_slots: u32,
    pub available_slots: u32,
    pub booked_slots: u32,
    /// Available share of all slots, rounded to a whole percent.
    pub availability_rate: u8,
}

impl ParkingSummary {
    /// Placeholder figures used when the backend cannot be reached.
    pub const DEMO: Self = Self {
        total_slots: 50,
        available_slots: 35,
        booked_slots: 15,
        availability_rate: 70,
    };

    /// Count a slot listing.
    ///
    /// An empty listing reports zero slots and a zero rate.
    #[must_use]
    pub fn from_slots(slots: &[ParkingSlot]) -> Self {
        let total = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        let available = u32::try_from(
            slots
                .iter()
                .filter(|slot| slot.status == SlotStatus::Available)
                .count(),
        )
        .unwrap_or(u32::MAX);

        let availability_rate = if total == 0 {
            0
        } else {
            let percent = (u64::from(available) * 100 + u64::from(total) / 2) / u64::from(total);
            u8::try_from(percent).unwrap_or(100)
        };

        Self {
            total_slots: total,
            available_slots: available,
            booked_slots: total - available,
            availability_rate,
        }
    }
}
