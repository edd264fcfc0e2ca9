//! Booking records and the request bodies that create or pay for them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{BookingId, PaymentId, SlotId};
use super::slot::ParkingSlot;
use super::status::{BookingStatus, PaymentStatus, VehicleType};

/// A booking as returned by the booking endpoints.
///
/// List endpoints omit most optional fields; detail endpoints fill them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub booking_reference: String,
    /// Nested slot record, present on most responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_slot: Option<ParkingSlot>,
    pub start_time: DateTime<Utc>,
    pub expected_end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub vehicle_number: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_color: String,
    #[serde(default)]
    pub base_rate: Decimal,
    #[serde(default)]
    pub premium_charges: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    #[serde(default)]
    pub special_requirements: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: String,
    #[serde(default)]
    pub can_cancel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Amount still owed on this booking.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        (self.total_amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Body of `POST /bookings/create/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub parking_slot_id: SlotId,
    pub start_time: DateTime<Utc>,
    pub expected_end_time: DateTime<Utc>,
    pub vehicle_number: String,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_color: String,
    #[serde(default)]
    pub special_requirements: String,
}

impl NewBooking {
    /// Start a booking request with the required fields; the rest default
    /// to empty.
    #[must_use]
    pub fn new(
        parking_slot_id: SlotId,
        start_time: DateTime<Utc>,
        expected_end_time: DateTime<Utc>,
        vehicle_number: impl Into<String>,
    ) -> Self {
        Self {
            parking_slot_id,
            start_time,
            expected_end_time,
            vehicle_number: vehicle_number.into(),
            vehicle_type: VehicleType::default(),
            vehicle_model: String::new(),
            vehicle_color: String::new(),
            special_requirements: String::new(),
        }
    }

    /// Set the vehicle type.
    #[must_use]
    pub fn with_vehicle_type(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_type = vehicle_type;
        self
    }

    /// Requested duration in minutes (negative if the window is inverted).
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.expected_end_time - self.start_time).num_minutes()
    }
}

/// Result of a successful booking creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    #[serde(default)]
    pub message: String,
    pub booking: Booking,
    #[serde(default)]
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub duration_hours: Decimal,
}

/// How a booking is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Card,
    DigitalWallet,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::DigitalWallet => "digital_wallet",
        })
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "digital_wallet" | "wallet" => Ok(Self::DigitalWallet),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Body of `POST /bookings/{id}/payment/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
}

/// Payment record returned alongside a paid booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    #[serde(default)]
    pub payment_reference: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// Backend uses `pending`/`completed`/`failed` here, unlike bookings.
    #[serde(default)]
    pub payment_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decodes_list_shape() {
        let booking: Booking = serde_json::from_value(json!({
            "id": 11,
            "booking_reference": "BK12345678",
            "parking_slot": {
                "id": 1,
                "slot_number": "G-A-101",
                "base_rate_per_hour": "30.00",
                "premium_rate_per_hour": "0.00"
            },
            "start_time": "2026-03-01T09:00:00Z",
            "expected_end_time": "2026-03-01T11:00:00Z",
            "status": "confirmed",
            "payment_status": "pending",
            "vehicle_number": "KA01AB1234",
            "vehicle_type": "suv",
            "total_amount": "60.00",
            "is_active": true,
            "can_cancel": true,
            "created_at": "2026-02-28T18:00:00Z"
        }))
        .unwrap();

        assert_eq!(booking.id, BookingId::new(11));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.vehicle_type, VehicleType::Suv);
        assert_eq!(booking.balance_due(), Decimal::from(60));
        assert_eq!(
            booking.parking_slot.map(|slot| slot.slot_number).as_deref(),
            Some("G-A-101")
        );
    }

    #[test]
    fn test_new_booking_body() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let request = NewBooking::new(SlotId::new(3), start, end, "KA01AB1234")
            .with_vehicle_type(VehicleType::Motorcycle);

        assert_eq!(request.duration_minutes(), 210);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["parking_slot_id"], 3);
        assert_eq!(body["vehicle_type"], "motorcycle");
        assert_eq!(body["vehicle_model"], "");
    }

    #[test]
    fn test_payment_request_body() {
        let body = serde_json::to_value(PaymentRequest {
            payment_method: PaymentMethod::DigitalWallet,
        })
        .unwrap();
        assert_eq!(body, json!({"payment_method": "digital_wallet"}));
        assert_eq!("wallet".parse::<PaymentMethod>(), Ok(PaymentMethod::DigitalWallet));
    }

    #[test]
    fn test_confirmation_accepts_float_costs() {
        let confirmation: BookingConfirmation = serde_json::from_value(json!({
            "message": "Booking created successfully",
            "booking": {
                "id": 4,
                "start_time": "2026-03-01T09:00:00Z",
                "expected_end_time": "2026-03-01T10:00:00Z"
            },
            "estimated_cost": 30.0,
            "duration_hours": 1.0
        }))
        .unwrap();
        assert_eq!(confirmation.estimated_cost, Decimal::from(30));
        assert_eq!(confirmation.booking.status, BookingStatus::Pending);
    }
}
