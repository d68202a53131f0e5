//! FinPlan: transaction reminders
//!
//! Main binary with subcommands:
//! - `daemon`: Hourly reminder loop with periodic health checks
//! - `due`: List reminder candidates around a point in time
//! - `check`: Run a single dispatch pass and report what was posted

use std::path::PathBuf;

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finplan_reminders::{Clock, SystemClock, Timestamp};

mod daemon;
mod oneshot;
mod settings;
mod sink;

use settings::Settings;

/// Parse an RFC 3339 timestamp, keeping its offset.
fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| format!("invalid timestamp '{}', expected RFC 3339: {}", s, e))
}

/// Parse an IANA time zone name such as `Europe/Berlin`.
fn parse_time_zone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>()
        .map_err(|e| format!("unknown time zone '{}': {}", s, e))
}

#[derive(Parser)]
#[command(name = "finplan")]
#[command(about = "Reminders for scheduled transactions", long_about = None)]
struct Cli {
    /// Path to the items JSON file (defaults to the user data directory)
    #[arg(long, global = true, env = "FINPLAN_ITEMS_PATH")]
    items: Option<PathBuf>,

    /// Optional JSON file overriding reminder settings
    #[arg(long, global = true, env = "FINPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds between health checks
    #[arg(long, global = true, env = "FINPLAN_HEALTH_CHECK_INTERVAL")]
    health_check_interval: Option<u64>,

    /// Time zone reminder hours are read in (defaults to the system zone)
    #[arg(long, global = true, env = "FINPLAN_TIME_ZONE", value_parser = parse_time_zone)]
    time_zone: Option<Tz>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder daemon until interrupted
    Daemon,

    /// List items that may need a reminder this month or next
    Due {
        /// Point in time to evaluate (defaults to now)
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Timestamp>,
    },

    /// Dispatch reminders due at the hour containing the given time
    Check {
        /// Point in time to evaluate (defaults to now)
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Timestamp>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "finplan=info,finplan_reminders=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(
        cli.items,
        cli.config.as_deref(),
        cli.health_check_interval,
        cli.time_zone,
    )
    .map_err(|e| miette::miette!("{}", e))?;

    match cli.command {
        Commands::Daemon => daemon::run(settings).await,
        Commands::Due { at } => oneshot::due(&settings, at.unwrap_or_else(|| SystemClock.now())),
        Commands::Check { at } => {
            oneshot::check(&settings, at.unwrap_or_else(|| SystemClock.now()))
        }
    }
}
