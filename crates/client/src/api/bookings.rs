//! Booking lifecycle for the logged-in user.
//!
//! None of these fall back to demo data: a booking or payment that did not
//! reach the backend must surface as an error.

use serde::Deserialize;
use serde_json::json;
use smart_parking_core::{Booking, BookingConfirmation, BookingId, NewBooking, Payment, PaymentRequest};
use tracing::instrument;

use crate::error::ApiError;
use crate::gateway::ApiClient;

/// Response of the check-in, check-out and cancel endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookingUpdate {
    #[serde(default)]
    pub message: String,
    pub booking: Booking,
    /// Present on check-out.
    #[serde(default)]
    pub final_cost: Option<rust_decimal::Decimal>,
}

/// Response of the payment endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentReceipt {
    #[serde(default)]
    pub message: String,
    pub payment: Payment,
    pub booking: Booking,
}

/// The history endpoint has returned both a bare list and a wrapper object.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    List(Vec<Booking>),
    Wrapped { completed_bookings: Vec<Booking> },
}

impl ApiClient {
    /// Reserve a slot.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` when the backend rejects the booking (slot
    /// taken, start in the past, end before start).
    #[instrument(skip(self, booking), fields(slot = %booking.parking_slot_id))]
    pub async fn create_booking(
        &self,
        booking: &NewBooking,
    ) -> Result<BookingConfirmation, ApiError> {
        self.post_json("/bookings/create/", booking).await
    }

    /// All of the user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn user_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get_json("/bookings/user/").await
    }

    /// Confirmed and active bookings.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn active_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get_json("/bookings/active/").await
    }

    /// Completed bookings.
    ///
    /// # Errors
    ///
    /// Returns the classified gateway error.
    #[instrument(skip(self))]
    pub async fn booking_history(&self) -> Result<Vec<Booking>, ApiError> {
        let history: HistoryResponse = self.get_json("/bookings/history/").await?;
        Ok(match history {
            HistoryResponse::List(bookings)
            | HistoryResponse::Wrapped {
                completed_bookings: bookings,
            } => bookings,
        })
    }

    /// One booking.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID, otherwise the classified
    /// gateway error.
    #[instrument(skip(self))]
    pub async fn booking(&self, id: BookingId) -> Result<Booking, ApiError> {
        self.get_json(&format!("/bookings/{id}/")).await
    }

    /// Cancel a booking, optionally recording why.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the booking can no longer be cancelled.
    #[instrument(skip(self, reason))]
    pub async fn cancel_booking(
        &self,
        id: BookingId,
        reason: Option<&str>,
    ) -> Result<BookingUpdate, ApiError> {
        self.post_json(
            &format!("/bookings/{id}/cancel/"),
            &json!({ "reason": reason.unwrap_or_default() }),
        )
        .await
    }

    /// Mark arrival at the slot.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the booking is not confirmed.
    #[instrument(skip(self))]
    pub async fn check_in(&self, id: BookingId) -> Result<BookingUpdate, ApiError> {
        self.post_json(&format!("/bookings/{id}/check-in/"), &json!({}))
            .await
    }

    /// Mark departure and free the slot.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the booking is not active.
    #[instrument(skip(self))]
    pub async fn check_out(&self, id: BookingId) -> Result<BookingUpdate, ApiError> {
        self.post_json(&format!("/bookings/{id}/check-out/"), &json!({}))
            .await
    }

    /// Pay for a booking.
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the booking was already paid.
    #[instrument(skip(self, payment), fields(method = %payment.payment_method))]
    pub async fn pay_booking(
        &self,
        id: BookingId,
        payment: &PaymentRequest,
    ) -> Result<PaymentReceipt, ApiError> {
        self.post_json(&format!("/bookings/{id}/payment/"), payment)
            .await
    }
}
