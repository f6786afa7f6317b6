//! Runtime configuration.

use std::{path::PathBuf, time::Duration};

use office_hours_core::OfficeHoursConfig;

/// Default interval between schedule polls.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How often rooms are opened and closed against the roster
    pub tick_interval: Duration,
    /// TOML roster file
    pub roster_path: PathBuf,
    /// Redb database holding staff records
    pub store_path: PathBuf,
    /// Core timing knobs
    pub office_hours: OfficeHoursConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            roster_path: PathBuf::from("roster.toml"),
            store_path: PathBuf::from("office-hours.redb"),
            office_hours: OfficeHoursConfig::default(),
        }
    }
}
