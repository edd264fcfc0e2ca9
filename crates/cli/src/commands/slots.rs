use smart_parking_client::fallback::demo_slots;
use smart_parking_client::{ApiClient, with_demo_fallback};
use smart_parking_core::SlotId;

use super::{CommandError, print_origin, print_slots};

pub async fn list(client: &ApiClient, available_only: bool) -> Result<(), CommandError> {
    let fetched = if available_only {
        client.available_slots_or_demo().await?
    } else {
        with_demo_fallback(client.slots().await, demo_slots)?
    };

    print_origin(&fetched.origin);
    print_slots(&fetched.data);
    Ok(())
}

pub async fn show(client: &ApiClient, id: SlotId) -> Result<(), CommandError> {
    let slot = client.slot(id).await?;

    println!("{} (#{})", slot.slot_number, slot.id);
    println!("  floor {} / {}", slot.floor, slot.zone);
    println!("  {} {} - {}", slot.slot_size, slot.slot_type, slot.status);
    println!(
        "  {} per hour (base {} + premium {})",
        slot.total_rate(),
        slot.base_rate_per_hour,
        slot.premium_rate_per_hour
    );
    let features = slot.features();
    if !features.is_empty() {
        println!("  features: {}", features.join(", "));
    }
    if !slot.location_notes.is_empty() {
        println!("  {}", slot.location_notes);
    }
    Ok(())
}

pub async fn summary(client: &ApiClient) -> Result<(), CommandError> {
    let fetched = client.parking_summary_or_demo().await?;
    print_origin(&fetched.origin);

    let is_demo = fetched.is_demo();
    let summary = fetched.data;
    println!("Total slots:     {}", summary.total_slots);
    println!("Available:       {}", summary.available_slots);
    println!("Booked:          {}", summary.booked_slots);
    println!("Availability:    {}%", summary.availability_rate);

    // The info endpoint adds a per-type breakdown; it is optional
    if !is_demo
        && let Ok(info) = client.parking_info().await
    {
        for count in info.slots_by_type {
            println!("  {:<10} {}", count.slot_type, count.count);
        }
    }
    Ok(())
}
