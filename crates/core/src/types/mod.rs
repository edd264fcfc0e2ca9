//! Core types for the Smart Parking client.
//!
//! This module provides type-safe wrappers for the backend's domain concepts.

pub mod booking;
pub mod email;
pub mod id;
pub mod slot;
pub mod status;
pub mod user;

pub use booking::{
    Booking, BookingConfirmation, NewBooking, Payment, PaymentMethod, PaymentRequest,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use slot::{ParkingSlot, ParkingSummary, SlotInput};
pub use status::*;
pub use user::UserProfile;
