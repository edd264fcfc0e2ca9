//! Typed endpoint methods on [`ApiClient`](crate::ApiClient), grouped by
//! backend area.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod profile;
pub mod slots;

pub use admin::{
    AdminDashboard, BookingStats, DEFAULT_MAINTENANCE_HOURS, RevenueStats, SlotMutation, SlotStats,
};
pub use auth::{
    ConnectionStatus, HealthStatus, MIN_PASSWORD_LENGTH, Registration, normalize_login_response,
};
pub use bookings::{BookingUpdate, PaymentReceipt};
pub use profile::{ProfileOverview, ProfileStats};
pub use slots::{ParkingInfo, SlotTypeCount};
