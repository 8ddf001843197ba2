//! Period reset policy.
//!
//! Three independent predicates compare today against the last date on
//! which reset bookkeeping ran. A single evaluation can fire any subset.
//!
//! The weekly predicate numbers weeks as `day_of_year / 7` with a 1-based
//! day of year. This does not follow ISO weeks: boundaries fall on whatever
//! weekday Jan 7, Jan 14, ... happen to be in a given year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// True when no reset ran yet or the last one was on another day.
pub fn should_reset_daily(today: NaiveDate, last_reset: Option<NaiveDate>) -> bool {
    last_reset.map_or(true, |last| last != today)
}

/// True when no reset ran yet, the year advanced, or the week number did.
pub fn should_reset_weekly(today: NaiveDate, last_reset: Option<NaiveDate>) -> bool {
    let Some(last) = last_reset else {
        return true;
    };
    today.year() > last.year() || week_number(today) > week_number(last)
}

/// True when no reset ran yet or the month or year differ.
pub fn should_reset_monthly(today: NaiveDate, last_reset: Option<NaiveDate>) -> bool {
    last_reset.map_or(true, |last| {
        today.month() != last.month() || today.year() != last.year()
    })
}

/// Week number used by [`should_reset_weekly`].
pub fn week_number(date: NaiveDate) -> u32 {
    date.ordinal() / 7
}

/// Which period counters a reconciliation zeroed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSet {
    pub daily: bool,
    pub weekly: bool,
    pub monthly: bool,
}

impl ResetSet {
    /// Evaluate all three predicates.
    pub fn evaluate(today: NaiveDate, last_reset: Option<NaiveDate>) -> Self {
        Self {
            daily: should_reset_daily(today, last_reset),
            weekly: should_reset_weekly(today, last_reset),
            monthly: should_reset_monthly(today, last_reset),
        }
    }

    pub fn any(&self) -> bool {
        self.daily || self.weekly || self.monthly
    }
}
