use serde_json::{Map, Value};
use smart_parking_client::ApiClient;

use super::{CommandError, print_bookings, require_login};

pub async fn show(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    let overview = client.profile().await?;

    println!("{} <{}>", overview.user.username, overview.user.email);
    println!(
        "  bookings: {} total, {} active, {} completed",
        overview.stats.total_bookings,
        overview.stats.active_bookings,
        overview.stats.completed_bookings
    );
    println!("  spent: {}", overview.stats.total_spent);
    if !overview.recent_bookings.is_empty() {
        println!("Recent:");
        print_bookings(&overview.recent_bookings);
    }
    Ok(())
}

pub async fn update(
    client: &ApiClient,
    fields: &[(&str, Option<String>)],
) -> Result<(), CommandError> {
    require_login(client)?;
    let changes: Map<String, Value> = fields
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| ((*key).to_string(), Value::String(value.clone())))
        })
        .collect();
    if changes.is_empty() {
        return Err(CommandError::InvalidArgument(
            "nothing to update; pass --email, --first-name or --last-name".to_string(),
        ));
    }

    client.update_profile(&changes).await?;
    println!("Profile updated.");
    Ok(())
}
