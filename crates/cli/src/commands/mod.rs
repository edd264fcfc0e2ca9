//! Command implementations. Each writes its result to stdout.

#![allow(clippy::print_stdout)]

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod profile;
pub mod slots;

use std::sync::Arc;

use smart_parking_client::{
    ApiClient, ApiError, AuthState, ClientConfig, ConfigError, DataOrigin, FileStore, SessionStore,
};
use smart_parking_core::{Booking, ParkingSlot};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not logged in. Run `parking login <username>` first")]
    NotLoggedIn,
}

/// Build the client from the environment and restore any stored session.
///
/// # Errors
///
/// Returns `CommandError` if configuration is invalid or the HTTP client
/// cannot be built.
pub fn connect() -> Result<ApiClient, CommandError> {
    let config = ClientConfig::from_env()?;
    let session = SessionStore::new(Arc::new(FileStore::new(&config.session_file)));

    if session.check_auth_status() == AuthState::Authenticated {
        tracing::debug!(file = %config.session_file.display(), "Restored session");
    }

    Ok(ApiClient::new(&config, session)?)
}

/// Fail early for commands that need a session.
fn require_login(client: &ApiClient) -> Result<(), CommandError> {
    if client.session().is_authenticated() {
        Ok(())
    } else {
        Err(CommandError::NotLoggedIn)
    }
}

fn print_origin(origin: &DataOrigin) {
    if let DataOrigin::Demo { reason } = origin {
        println!("[demo data] backend unavailable ({reason}); nothing shown here can be booked");
    }
}

fn print_slots(slots: &[ParkingSlot]) {
    if slots.is_empty() {
        println!("No slots.");
        return;
    }
    println!(
        "{:>5}  {:<10} {:<5} {:<16} {:<9} {:<8} {:<12} {:>8}",
        "ID", "NUMBER", "FLOOR", "ZONE", "TYPE", "SIZE", "STATUS", "RATE/H"
    );
    for slot in slots {
        println!(
            "{:>5}  {:<10} {:<5} {:<16} {:<9} {:<8} {:<12} {:>8}",
            slot.id,
            slot.slot_number,
            slot.floor,
            slot.zone,
            slot.slot_type,
            slot.slot_size,
            slot.status,
            slot.total_rate(),
        );
    }
}

fn print_bookings(bookings: &[Booking]) {
    if bookings.is_empty() {
        println!("No bookings.");
        return;
    }
    for booking in bookings {
        print_booking(booking);
    }
}

fn print_booking(booking: &Booking) {
    let slot = booking
        .parking_slot
        .as_ref()
        .map_or("-", |slot| slot.slot_number.as_str());
    println!(
        "#{} {} slot {} {} -> {} [{} / {}] total {} due {}",
        booking.id,
        booking.booking_reference,
        slot,
        booking.start_time.format("%Y-%m-%d %H:%M"),
        booking.expected_end_time.format("%Y-%m-%d %H:%M"),
        booking.status,
        booking.payment_status,
        booking.total_amount,
        booking.balance_due(),
    );
}

fn print_json(value: &serde_json::Value) -> Result<(), CommandError> {
    let pretty = serde_json::to_string_pretty(value).map_err(ApiError::from)?;
    println!("{pretty}");
    Ok(())
}
