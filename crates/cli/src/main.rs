//! Smart Parking CLI - Find, book and pay for parking from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (prompts for the password unless PARKING_PASSWORD is set)
//! parking login driver
//!
//! # Browse slots; falls back to demo data when the backend is down
//! parking slots --available
//!
//! # Book slot 3 for two hours starting at 09:00 local time
//! parking book 3 --start 2026-10-20T09:00 --hours 2 --vehicle KA01AB1234
//!
//! # Pay for booking 12 by card
//! parking pay 12 --method card
//!
//! # Put slot 3 into maintenance for 48 hours (staff only)
//! parking admin status 3 maintenance --hours 48
//! ```
//!
//! # Environment Variables
//!
//! - `PARKING_API_URL`, `PARKING_SESSION_FILE`, `PARKING_REQUEST_TIMEOUT_SECS` -
//!   see `smart_parking_client::ClientConfig`
//! - `PARKING_LOG_FORMAT` - `json` for structured logs on stderr
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - optional error reporting
//! - `RUST_LOG` - log filter (default: `smart_parking=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use smart_parking_core::{
    BookingId, PaymentMethod, SlotId, SlotSize, SlotStatus, SlotType, VehicleType,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "parking")]
#[command(author, version, about = "Smart Parking command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        username: String,

        /// Password (prompted for when omitted)
        #[arg(long, env = "PARKING_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create an account
    Register {
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (prompted for twice when omitted)
        #[arg(long, env = "PARKING_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Check that the backend is reachable
    Health,
    /// List parking slots
    Slots {
        /// Only slots that can be booked now
        #[arg(short, long)]
        available: bool,
    },
    /// Show one slot
    Slot { id: SlotId },
    /// Occupancy summary
    Summary,
    /// Book a slot
    Book(BookArgs),
    /// List your bookings
    Bookings {
        /// Only confirmed and active bookings
        #[arg(long, conflicts_with = "history")]
        active: bool,

        /// Only completed bookings
        #[arg(long)]
        history: bool,
    },
    /// Cancel a booking
    Cancel {
        id: BookingId,

        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Check in to a booked slot
    CheckIn { id: BookingId },
    /// Check out and free the slot
    CheckOut { id: BookingId },
    /// Pay for a booking
    Pay {
        id: BookingId,

        /// `cash`, `card` or `digital_wallet`
        #[arg(short, long, default_value = "card")]
        method: PaymentMethod,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Staff tools
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Args)]
struct BookArgs {
    slot: SlotId,

    /// Start time, RFC 3339 or local `YYYY-MM-DDTHH:MM`
    #[arg(short, long)]
    start: String,

    /// Duration in hours
    #[arg(long, default_value_t = 1)]
    hours: u32,

    /// Vehicle registration number
    #[arg(long)]
    vehicle: String,

    #[arg(long, default_value = "sedan")]
    vehicle_type: VehicleType,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Update profile fields
    Update {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every slot
    Slots,
    /// Create a slot
    Create(SlotArgs),
    /// Update a slot
    Update {
        id: SlotId,

        #[command(flatten)]
        fields: SlotArgs,
    },
    /// Delete a slot
    Delete { id: SlotId },
    /// Change a slot's status
    Status {
        id: SlotId,

        /// `available`, `occupied` or `maintenance`
        status: SlotStatus,

        /// Maintenance window in hours
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Occupancy, booking and revenue statistics
    Dashboard,
    /// List every booking
    Bookings,
    /// List users
    Users,
    /// Revenue and usage reports
    Reports,
}

/// Slot fields; everything is optional so the same set serves create and
/// update.
#[derive(Args)]
struct SlotArgs {
    #[arg(long)]
    number: Option<String>,

    #[arg(long)]
    floor: Option<String>,

    #[arg(long)]
    zone: Option<String>,

    #[arg(long)]
    slot_type: Option<SlotType>,

    #[arg(long)]
    size: Option<SlotSize>,

    #[arg(long)]
    base_rate: Option<Decimal>,

    #[arg(long)]
    premium_rate: Option<Decimal>,

    #[arg(long)]
    ev_charging: Option<bool>,

    #[arg(long)]
    accessible: Option<bool>,

    #[arg(long)]
    covered: Option<bool>,

    #[arg(long)]
    camera: Option<bool>,

    #[arg(long)]
    notes: Option<String>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smart_parking=info,parking=info".into());

    // Logs go to stderr; stdout carries command output
    let json = std::env::var("PARKING_LOG_FORMAT").is_ok_and(|format| format == "json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = commands::connect()?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&client, &username, password).await?;
        }
        Commands::Logout => commands::auth::logout(&client).await,
        Commands::Whoami => commands::auth::whoami(&client)?,
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&client, username, email, password).await?,
        Commands::Health => commands::auth::health(&client).await?,
        Commands::Slots { available } => commands::slots::list(&client, available).await?,
        Commands::Slot { id } => commands::slots::show(&client, id).await?,
        Commands::Summary => commands::slots::summary(&client).await?,
        Commands::Book(args) => {
            let request = commands::bookings::BookRequest {
                slot: args.slot,
                start: args.start,
                hours: args.hours,
                vehicle: args.vehicle,
                vehicle_type: args.vehicle_type,
            };
            commands::bookings::book(&client, request).await?;
        }
        Commands::Bookings { active, history } => {
            commands::bookings::list(&client, active, history).await?;
        }
        Commands::Cancel { id, reason } => {
            commands::bookings::cancel(&client, id, reason.as_deref()).await?;
        }
        Commands::CheckIn { id } => commands::bookings::check_in(&client, id).await?,
        Commands::CheckOut { id } => commands::bookings::check_out(&client, id).await?,
        Commands::Pay { id, method } => commands::bookings::pay(&client, id, method).await?,
        Commands::Profile { action } => match action {
            None => commands::profile::show(&client).await?,
            Some(ProfileAction::Update {
                email,
                first_name,
                last_name,
            }) => {
                let fields = [
                    ("email", email),
                    ("first_name", first_name),
                    ("last_name", last_name),
                ];
                commands::profile::update(&client, &fields).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Slots => commands::admin::slots(&client).await?,
            AdminAction::Create(fields) => {
                commands::admin::create(&client, &fields.into_input()).await?;
            }
            AdminAction::Update { id, fields } => {
                commands::admin::update(&client, id, &fields.into_input()).await?;
            }
            AdminAction::Delete { id } => commands::admin::delete(&client, id).await?,
            AdminAction::Status { id, status, hours } => {
                commands::admin::status(&client, id, status, hours).await?;
            }
            AdminAction::Dashboard => commands::admin::dashboard(&client).await?,
            AdminAction::Bookings => commands::admin::bookings(&client).await?,
            AdminAction::Users => commands::admin::users(&client).await?,
            AdminAction::Reports => commands::admin::reports(&client).await?,
        },
    }
    Ok(())
}

impl SlotArgs {
    fn into_input(self) -> smart_parking_core::SlotInput {
        smart_parking_core::SlotInput {
            slot_number: self.number,
            floor: self.floor,
            zone: self.zone,
            slot_type: self.slot_type,
            slot_size: self.size,
            base_rate_per_hour: self.base_rate,
            premium_rate_per_hour: self.premium_rate,
            is_ev_charging: self.ev_charging,
            is_handicap_accessible: self.accessible,
            is_covered: self.covered,
            has_security_camera: self.camera,
            location_notes: self.notes,
            ..Default::default()
        }
    }
}
