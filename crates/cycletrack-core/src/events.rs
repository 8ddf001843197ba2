use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::scheduler::JobName;

/// Every state change in the system produces an Event.
/// The CLI prints them; the daemon logs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Period counters were zeroed on crossing a boundary.
    PeriodsReset {
        daily: bool,
        weekly: bool,
        monthly: bool,
        on: NaiveDate,
    },
    CheckedIn {
        today_cycles: u32,
        /// Cycles newly added to the week and month totals.
        delta: u32,
        week_cycles: u32,
        month_cycles: u32,
        at: NaiveDateTime,
    },
    RecordsCleared {
        at: NaiveDateTime,
    },
    ReminderSent {
        at: NaiveDateTime,
    },
    /// Reminder conditions held but the notifier had no permission.
    ReminderSuppressed {
        at: NaiveDateTime,
    },
    JobRegistered {
        job: JobName,
        next_run: NaiveDateTime,
        replaced: bool,
    },
}
