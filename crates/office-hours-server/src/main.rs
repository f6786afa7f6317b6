//! Office hours server binary.
//!
//! # Usage
//!
//! ```bash
//! # Read voice events from stdin against the roster in roster.toml
//! office-hours --roster roster.toml --store office-hours.redb
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use office_hours_core::OfficeHoursConfig;
use office_hours_server::{
    LoggingPlatform, RedbStaffStore, Runtime, RuntimeConfig, SystemEnv, console, load_roster,
};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Course office hours queue
#[derive(Parser, Debug)]
#[command(name = "office-hours")]
#[command(about = "Course office hours queue and room allocation")]
#[command(version)]
struct Args {
    /// Staff roster (TOML)
    #[arg(short, long, default_value = "roster.toml")]
    roster: PathBuf,

    /// Staff record database
    #[arg(short, long, default_value = "office-hours.redb")]
    store: PathBuf,

    /// Seconds between schedule polls
    #[arg(long, default_value = "5")]
    tick_secs: u64,

    /// Seconds a room rests between students
    #[arg(long, default_value = "30")]
    grace_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = RuntimeConfig {
        tick_interval: Duration::from_secs(args.tick_secs.max(1)),
        roster_path: args.roster,
        store_path: args.store,
        office_hours: OfficeHoursConfig {
            grace_delay: Duration::from_secs(args.grace_secs),
            ..OfficeHoursConfig::default()
        },
    };

    tracing::info!("Office hours starting");
    let roster = load_roster(&config.roster_path)?;
    tracing::info!(staff = roster.len(), path = %config.roster_path.display(), "Roster loaded");

    let store = RedbStaffStore::open(&config.store_path)?;
    let mut runtime = Runtime::new(SystemEnv::new(), LoggingPlatform::new(), store, config);
    runtime.recover(roster).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let console = tokio::spawn(console::read_events(stdin, runtime.sender()));
    runtime
        .run(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
                _ = console => {},
            }
        })
        .await;

    Ok(())
}
