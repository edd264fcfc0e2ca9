//! Staff commands.
//!
//! The backend decides who is staff; a non-staff session gets a 403 which
//! surfaces as `Forbidden`.

use smart_parking_client::ApiClient;
use smart_parking_core::{SlotId, SlotInput, SlotStatus};

use super::{CommandError, print_bookings, print_json, print_origin, print_slots, require_login};

pub async fn slots(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    let fetched = client.admin_slots_or_demo().await?;
    print_origin(&fetched.origin);
    print_slots(&fetched.data);
    Ok(())
}

pub async fn create(client: &ApiClient, input: &SlotInput) -> Result<(), CommandError> {
    require_login(client)?;
    if input.slot_number.is_none() {
        return Err(CommandError::InvalidArgument(
            "--number is required to create a slot".to_string(),
        ));
    }

    let created = client.create_slot(input).await?;
    println!("{}", created.message);
    print_slots(std::slice::from_ref(&created.slot));
    Ok(())
}

pub async fn update(client: &ApiClient, id: SlotId, input: &SlotInput) -> Result<(), CommandError> {
    require_login(client)?;
    if input == &SlotInput::default() {
        return Err(CommandError::InvalidArgument(
            "nothing to update".to_string(),
        ));
    }

    let updated = client.update_slot(id, input).await?;
    println!("{}", updated.message);
    print_slots(std::slice::from_ref(&updated.slot));
    Ok(())
}

pub async fn delete(client: &ApiClient, id: SlotId) -> Result<(), CommandError> {
    require_login(client)?;
    client.delete_slot(id).await?;
    println!("Slot {id} deleted.");
    Ok(())
}

pub async fn status(
    client: &ApiClient,
    id: SlotId,
    status: SlotStatus,
    hours: Option<u32>,
) -> Result<(), CommandError> {
    require_login(client)?;
    let changed = client.change_slot_status(id, status, hours).await?;
    println!("{}", changed.message);
    print_slots(std::slice::from_ref(&changed.slot));
    Ok(())
}

pub async fn dashboard(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    let dashboard = client.dashboard().await?;

    let slots = &dashboard.slot_stats;
    println!(
        "Slots     {} total, {} available, {} occupied, {} maintenance ({:.1}% utilized)",
        slots.total, slots.available, slots.occupied, slots.maintenance, slots.utilization_rate
    );
    let bookings = &dashboard.booking_stats;
    println!(
        "Bookings  {} total, {} active, {} completed ({:.1}% completed)",
        bookings.total, bookings.active, bookings.completed, bookings.completion_rate
    );
    let revenue = &dashboard.revenue_stats;
    println!(
        "Revenue   {} total, {} today, {} per booking",
        revenue.total_revenue, revenue.today_revenue, revenue.average_booking_value
    );

    if !dashboard.popular_slots.is_empty() {
        println!("Popular slots:");
        print_slots(&dashboard.popular_slots);
    }
    if !dashboard.recent_bookings.is_empty() {
        println!("Recent bookings:");
        print_bookings(&dashboard.recent_bookings);
    }
    Ok(())
}

pub async fn bookings(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    print_bookings(&client.admin_bookings().await?);
    Ok(())
}

pub async fn users(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    print_json(&client.admin_users().await?)
}

pub async fn reports(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    print_json(&client.admin_reports().await?)
}
