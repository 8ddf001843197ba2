mod config;
pub mod database;
pub mod memory;

pub use config::{Config, CycleConfig, NotificationsConfig, ReminderConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::Result;
use crate::state::CounterState;

/// Persistence contract for [`CounterState`].
///
/// Implementations must treat missing or malformed fields as defaults on
/// load. `update` runs a whole load-modify-save sequence; stores that can
/// serialize writers across processes override it.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<CounterState>;

    fn save(&self, state: &CounterState) -> Result<()>;

    /// Load, apply `f`, save. Returns the saved state.
    fn update(
        &self,
        f: &mut dyn FnMut(CounterState) -> CounterState,
    ) -> Result<CounterState> {
        let next = f(self.load()?);
        self.save(&next)?;
        Ok(next)
    }
}

/// Returns the data directory, creating it if needed.
///
/// `CYCLETRACK_DATA_DIR` wins when set. Otherwise `~/.config/cycletrack`,
/// or `~/.config/cycletrack-dev` with `CYCLETRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("CYCLETRACK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("CYCLETRACK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("cycletrack-dev")
            } else {
                base_dir.join("cycletrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
