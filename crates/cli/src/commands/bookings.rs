//! Booking lifecycle commands.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use smart_parking_client::ApiClient;
use smart_parking_core::{
    BookingId, NewBooking, PaymentMethod, PaymentRequest, SlotId, VehicleType,
};

use super::{CommandError, print_booking, print_bookings, require_login};

/// Local formats accepted for `--start`, tried after RFC 3339.
const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Arguments of `parking book`.
pub struct BookRequest {
    pub slot: SlotId,
    pub start: String,
    pub hours: u32,
    pub vehicle: String,
    pub vehicle_type: VehicleType,
}

/// Parse a start time given either with an offset or in local time.
fn parse_start<Tz: TimeZone>(raw: &str, local: &Tz) -> Result<DateTime<Utc>, CommandError> {
    if let Ok(start) = DateTime::parse_from_rfc3339(raw) {
        return Ok(start.with_timezone(&Utc));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| local.from_local_datetime(&naive).single())
        .map(|start| start.with_timezone(&Utc))
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "start time {raw:?} is not RFC 3339 or YYYY-MM-DDTHH:MM"
            ))
        })
}

pub async fn book(client: &ApiClient, request: BookRequest) -> Result<(), CommandError> {
    require_login(client)?;
    if request.hours == 0 {
        return Err(CommandError::InvalidArgument(
            "duration must be at least one hour".to_string(),
        ));
    }

    let start = parse_start(&request.start, &Local)?;
    let end = start + TimeDelta::hours(i64::from(request.hours));
    let booking = NewBooking::new(request.slot, start, end, request.vehicle)
        .with_vehicle_type(request.vehicle_type);

    let confirmation = client.create_booking(&booking).await?;
    println!("{}", confirmation.message);
    print_booking(&confirmation.booking);
    println!(
        "Estimated cost {} for {} hours",
        confirmation.estimated_cost, confirmation.duration_hours
    );
    Ok(())
}

pub async fn list(client: &ApiClient, active: bool, history: bool) -> Result<(), CommandError> {
    require_login(client)?;
    let bookings = if active {
        client.active_bookings().await?
    } else if history {
        client.booking_history().await?
    } else {
        client.user_bookings().await?
    };
    print_bookings(&bookings);
    Ok(())
}

pub async fn cancel(
    client: &ApiClient,
    id: BookingId,
    reason: Option<&str>,
) -> Result<(), CommandError> {
    require_login(client)?;
    let update = client.cancel_booking(id, reason).await?;
    println!("{}", update.message);
    print_booking(&update.booking);
    Ok(())
}

pub async fn check_in(client: &ApiClient, id: BookingId) -> Result<(), CommandError> {
    require_login(client)?;
    let update = client.check_in(id).await?;
    println!("{}", update.message);
    print_booking(&update.booking);
    Ok(())
}

pub async fn check_out(client: &ApiClient, id: BookingId) -> Result<(), CommandError> {
    require_login(client)?;
    let update = client.check_out(id).await?;
    println!("{}", update.message);
    print_booking(&update.booking);
    if let Some(cost) = update.final_cost {
        println!("Final cost {cost}");
    }
    Ok(())
}

pub async fn pay(
    client: &ApiClient,
    id: BookingId,
    method: PaymentMethod,
) -> Result<(), CommandError> {
    require_login(client)?;
    let receipt = client
        .pay_booking(id, &PaymentRequest { payment_method: method })
        .await?;
    println!("{}", receipt.message);
    println!(
        "Payment {} of {} by {} ({})",
        receipt.payment.payment_reference,
        receipt.payment.amount,
        receipt.payment.payment_method,
        receipt.payment.payment_status
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let start = parse_start("2026-10-20T09:00:00+05:30", &utc).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-10-20T03:30:00+00:00");
    }

    #[test]
    fn test_parse_local() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let start = parse_start("2026-10-20T09:00", &ist).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-10-20T03:30:00+00:00");
        assert_eq!(parse_start("2026-10-20 09:00", &ist).unwrap(), start);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(matches!(
            parse_start("tomorrow", &utc),
            Err(CommandError::InvalidArgument(_))
        ));
    }
}
