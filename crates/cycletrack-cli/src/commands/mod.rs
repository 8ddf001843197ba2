pub mod checkin;
pub mod config;
pub mod daemon;
pub mod jobs;
pub mod widget;

use chrono::{Local, NaiveDateTime};
use cycletrack_core::{Config, Database, Reconciler};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

const AT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parse the `--at` override.
pub fn parse_at(s: &str) -> Result<NaiveDateTime, String> {
    AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM, got '{s}'"))
}

pub fn now(at: Option<NaiveDateTime>) -> NaiveDateTime {
    at.unwrap_or_else(|| Local::now().naive_local())
}

/// Open the default database behind a reconciler using the configured clock.
fn open_reconciler(config: &Config) -> Result<Reconciler<Database>, Box<dyn std::error::Error>> {
    let clock = config.cycle_clock()?;
    Ok(Reconciler::new(Database::open()?, clock))
}
