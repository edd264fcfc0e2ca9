//! Demo-data substitution for read screens.
//!
//! When a listing cannot be loaded because the backend is unreachable or
//! failing, a screen may show fixed sample records instead of an error. The
//! result is always tagged with its [`DataOrigin`] and every sample slot has
//! `is_demo` set, so nobody books against data that is not real.

use rust_decimal::Decimal;
use smart_parking_core::{ParkingSlot, ParkingSummary, SlotId, SlotSize, SlotStatus, SlotType};

use crate::error::ApiError;

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    /// Returned by the backend.
    Live,
    /// Substituted sample data.
    Demo {
        /// Why the live fetch failed.
        reason: String,
    },
}

/// A value tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: DataOrigin,
}

impl<T> Fetched<T> {
    #[must_use]
    pub const fn live(data: T) -> Self {
        Self {
            data,
            origin: DataOrigin::Live,
        }
    }

    #[must_use]
    pub fn demo(data: T, reason: impl Into<String>) -> Self {
        Self {
            data,
            origin: DataOrigin::Demo {
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub const fn is_demo(&self) -> bool {
        matches!(self.origin, DataOrigin::Demo { .. })
    }

    /// Transform the data, keeping the origin.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            origin: self.origin,
        }
    }
}

/// Keep a live result, or substitute `demo()` for network and server
/// failures.
///
/// # Errors
///
/// Every other error is returned unchanged; in particular `AuthExpired` must
/// reach the caller so it can send the user to login.
pub fn with_demo_fallback<T>(
    result: Result<T, ApiError>,
    demo: impl FnOnce() -> T,
) -> Result<Fetched<T>, ApiError> {
    match result {
        Ok(data) => Ok(Fetched::live(data)),
        Err(e) if e.is_fallback_eligible() => {
            tracing::warn!(error = %e, "Backend unavailable, showing demo data");
            Ok(Fetched::demo(demo(), e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Fixed sample slots covering each floor, type and size the UI renders.
#[must_use]
pub fn demo_slots() -> Vec<ParkingSlot> {
    vec![
        demo_slot(DemoSlot {
            id: 1,
            slot_number: "G-A-101",
            floor: "G",
            zone: "Main Entrance",
            slot_type: SlotType::Standard,
            slot_size: SlotSize::Medium,
            status: SlotStatus::Available,
            rates: (30, 0),
            flags: [false, false, false, true],
            location_notes: "Near main entrance",
            description: "Standard parking slot near main entrance",
        }),
        demo_slot(DemoSlot {
            id: 2,
            slot_number: "G-B-102",
            floor: "G",
            zone: "Premium Zone",
            slot_type: SlotType::Premium,
            slot_size: SlotSize::Large,
            status: SlotStatus::Available,
            rates: (50, 20),
            flags: [true, true, true, true],
            location_notes: "Premium spot near elevator",
            description: "Premium parking with all features",
        }),
        demo_slot(DemoSlot {
            id: 3,
            slot_number: "1-C-201",
            floor: "1",
            zone: "North Wing",
            slot_type: SlotType::Standard,
            slot_size: SlotSize::Compact,
            status: SlotStatus::Available,
            rates: (25, 0),
            flags: [false, false, false, false],
            location_notes: "Compact car slot",
            description: "Compact car parking slot",
        }),
        demo_slot(DemoSlot {
            id: 4,
            slot_number: "B1-D-001",
            floor: "B1",
            zone: "Basement",
            slot_type: SlotType::Covered,
            slot_size: SlotSize::Xlarge,
            status: SlotStatus::Occupied,
            rates: (40, 10),
            flags: [false, false, true, true],
            location_notes: "Basement covered parking",
            description: "Large covered parking in basement",
        }),
        demo_slot(DemoSlot {
            id: 5,
            slot_number: "G-E-103",
            floor: "G",
            zone: "EV Zone",
            slot_type: SlotType::Standard,
            slot_size: SlotSize::Medium,
            status: SlotStatus::Available,
            rates: (35, 15),
            flags: [true, true, false, true],
            location_notes: "EV charging station",
            description: "Electric vehicle charging slot",
        }),
    ]
}

/// Sample slots that are currently bookable.
#[must_use]
pub fn demo_available_slots() -> Vec<ParkingSlot> {
    demo_slots()
        .into_iter()
        .filter(|slot| slot.status == SlotStatus::Available)
        .collect()
}

/// Dashboard figures shown when occupancy cannot be computed.
#[must_use]
pub const fn demo_summary() -> ParkingSummary {
    ParkingSummary::DEMO
}

struct DemoSlot {
    id: i64,
    slot_number: &'static str,
    floor: &'static str,
    zone: &'static str,
    slot_type: SlotType,
    slot_size: SlotSize,
    status: SlotStatus,
    /// Base and premium hourly rate.
    rates: (i64, i64),
    /// EV charging, accessible, covered, camera.
    flags: [bool; 4],
    location_notes: &'static str,
    description: &'static str,
}

fn demo_slot(seed: DemoSlot) -> ParkingSlot {
    let [ev, accessible, covered, camera] = seed.flags;
    let base = Decimal::from(seed.rates.0);
    let premium = Decimal::from(seed.rates.1);

    let mut slot = ParkingSlot {
        id: SlotId::new(seed.id),
        slot_number: seed.slot_number.to_string(),
        floor: seed.floor.to_string(),
        zone: seed.zone.to_string(),
        slot_type: seed.slot_type,
        slot_size: seed.slot_size,
        status: seed.status,
        base_rate_per_hour: base,
        premium_rate_per_hour: premium,
        total_rate_per_hour: Some(base + premium),
        is_ev_charging: ev,
        is_handicap_accessible: accessible,
        is_covered: covered,
        has_security_camera: camera,
        features_list: Vec::new(),
        location_notes: seed.location_notes.to_string(),
        description: Some(seed.description.to_string()),
        is_active: true,
        is_demo: true,
    };
    slot.features_list = slot.features();
    slot
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_slots_are_marked() {
        let slots = demo_slots();
        assert_eq!(slots.len(), 5);
        assert!(slots.iter().all(|slot| slot.is_demo));
        assert_eq!(
            slots.iter().map(|s| s.slot_number.as_str()).collect::<Vec<_>>(),
            ["G-A-101", "G-B-102", "1-C-201", "B1-D-001", "G-E-103"]
        );
    }

    #[test]
    fn test_demo_slot_details() {
        let slots = demo_slots();
        let premium = &slots[1];
        assert_eq!(premium.total_rate(), Decimal::from(70));
        assert_eq!(
            premium.features_list,
            ["EV Charging", "Handicap Accessible", "Covered", "Security Camera"]
        );
        assert!(slots[2].features_list.is_empty());
        assert_eq!(demo_available_slots().len(), 4);
    }

    #[test]
    fn test_live_result_is_not_demo() {
        let fetched = with_demo_fallback(Ok(vec![1]), || vec![99]).unwrap();
        assert_eq!(fetched.data, vec![1]);
        assert_eq!(fetched.origin, DataOrigin::Live);
    }

    #[test]
    fn test_network_failure_uses_demo() {
        let fetched = with_demo_fallback(
            Err::<Vec<i32>, _>(ApiError::NetworkError("connection refused".into())),
            || vec![99],
        )
        .unwrap();
        assert!(fetched.is_demo());
        assert_eq!(fetched.data, vec![99]);
    }

    #[test]
    fn test_server_error_uses_demo() {
        let fetched = with_demo_fallback(
            Err::<u8, _>(ApiError::ServerError {
                status: 500,
                message: "database is locked".into(),
            }),
            || 7,
        )
        .unwrap();
        assert!(fetched.is_demo());
    }

    #[test]
    fn test_other_errors_propagate() {
        let result = with_demo_fallback(Err::<u8, _>(ApiError::AuthExpired), || 7);
        assert!(matches!(result, Err(ApiError::AuthExpired)));

        let result = with_demo_fallback(
            Err::<u8, _>(ApiError::Forbidden {
                message: "Admin access required".into(),
            }),
            || 7,
        );
        assert!(matches!(result, Err(ApiError::Forbidden { .. })));
    }

    #[test]
    fn test_demo_summary() {
        let summary = demo_summary();
        assert_eq!(summary.total_slots, 50);
        assert_eq!(summary.available_slots, 35);
        assert_eq!(summary.booked_slots, 15);
        assert_eq!(summary.availability_rate, 70);
    }
}
