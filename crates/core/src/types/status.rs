//! Status and classification enums for slots and bookings.
//!
//! Values serialize as the backend's lowercase choice keys.

use serde::{Deserialize, Serialize};

/// Occupancy state of a parking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
}

/// Kind of parking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    #[default]
    Standard,
    Premium,
    Valet,
    Covered,
}

/// Physical size of a parking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotSize {
    Compact,
    #[default]
    Medium,
    Large,
    Xlarge,
}

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still holds its slot.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Active)
    }
}

/// Payment status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// Vehicle category recorded on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Compact,
    #[default]
    Sedan,
    Suv,
    Truck,
    Van,
    Motorcycle,
}

macro_rules! impl_choice_str {
    ($ty:ty { $($variant:ident => $key:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.pad($key),)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {s}", stringify!($ty))),
                }
            }
        }
    };
}

impl_choice_str!(SlotStatus {
    Available => "available",
    Occupied => "occupied",
    Maintenance => "maintenance",
});

impl_choice_str!(SlotType {
    Standard => "standard",
    Premium => "premium",
    Valet => "valet",
    Covered => "covered",
});

impl_choice_str!(SlotSize {
    Compact => "compact",
    Medium => "medium",
    Large => "large",
    Xlarge => "xlarge",
});

impl_choice_str!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl_choice_str!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
});

impl_choice_str!(VehicleType {
    Compact => "compact",
    Sedan => "sedan",
    Suv => "suv",
    Truck => "truck",
    Van => "van",
    Motorcycle => "motorcycle",
});
