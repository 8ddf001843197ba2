//! Persisted counter state and its key-value encoding.
//!
//! The record is stored as individual string values under fixed keys.
//! Reading is lenient: a missing or malformed value falls back to its
//! default instead of failing the load.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const KEY_LAST_CHECK_IN: &str = "last_check_in";
pub const KEY_TODAY_CYCLES: &str = "today_cycles";
pub const KEY_WEEK_CYCLES: &str = "week_cycles";
pub const KEY_MONTH_CYCLES: &str = "month_cycles";
pub const KEY_LAST_RESET_DATE: &str = "last_reset_date";
pub const KEY_LAST_RECORDED_TODAY_CYCLES: &str = "last_recorded_today_cycles";

/// Every key owned by [`CounterState`].
pub const STATE_KEYS: [&str; 6] = [
    KEY_LAST_CHECK_IN,
    KEY_TODAY_CYCLES,
    KEY_WEEK_CYCLES,
    KEY_MONTH_CYCLES,
    KEY_LAST_RESET_DATE,
    KEY_LAST_RECORDED_TODAY_CYCLES,
];

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The single persisted record of check-in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub last_check_in: Option<NaiveDateTime>,
    pub today_cycles: u32,
    pub week_cycles: u32,
    pub month_cycles: u32,
    pub last_reset_date: Option<NaiveDate>,
    /// `today_cycles` as of the last check-in; the baseline for the next delta.
    pub last_recorded_today_cycles: u32,
}

/// One stored field: `None` means the key is removed.
pub type Entry = (&'static str, Option<String>);

impl CounterState {
    /// Whether the last check-in happened on `today`.
    pub fn checked_in_on(&self, today: NaiveDate) -> bool {
        self.last_check_in.map(|at| at.date()) == Some(today)
    }

    /// Encode as key-value entries. Absent optionals become removals.
    pub fn to_entries(&self) -> [Entry; 6] {
        [
            (
                KEY_LAST_CHECK_IN,
                self.last_check_in
                    .map(|at| at.format(DATE_TIME_FORMAT).to_string()),
            ),
            (KEY_TODAY_CYCLES, Some(self.today_cycles.to_string())),
            (KEY_WEEK_CYCLES, Some(self.week_cycles.to_string())),
            (KEY_MONTH_CYCLES, Some(self.month_cycles.to_string())),
            (
                KEY_LAST_RESET_DATE,
                self.last_reset_date
                    .map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            (
                KEY_LAST_RECORDED_TODAY_CYCLES,
                Some(self.last_recorded_today_cycles.to_string()),
            ),
        ]
    }

    /// Decode from a key lookup. Never fails.
    pub fn from_lookup<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            last_check_in: get(KEY_LAST_CHECK_IN)
                .and_then(|raw| parse_or_warn(KEY_LAST_CHECK_IN, &raw, parse_date_time)),
            today_cycles: read_count(&mut get, KEY_TODAY_CYCLES),
            week_cycles: read_count(&mut get, KEY_WEEK_CYCLES),
            month_cycles: read_count(&mut get, KEY_MONTH_CYCLES),
            last_reset_date: get(KEY_LAST_RESET_DATE)
                .and_then(|raw| parse_or_warn(KEY_LAST_RESET_DATE, &raw, parse_date)),
            last_recorded_today_cycles: read_count(&mut get, KEY_LAST_RECORDED_TODAY_CYCLES),
        }
    }
}

fn read_count<F>(get: &mut F, key: &str) -> u32
where
    F: FnMut(&str) -> Option<String>,
{
    get(key)
        .and_then(|raw| parse_or_warn(key, &raw, |s| s.trim().parse::<u32>().ok()))
        .unwrap_or(0)
}

fn parse_or_warn<T>(key: &str, raw: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!(key, value = raw, "ignoring malformed stored value");
    }
    parsed
}

/// Accepts `2024-03-14T20:00:00`, with or without seconds or fractions.
fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn decode(pairs: &[(&str, &str)]) -> CounterState {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CounterState::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_store_decodes_to_default() {
        assert_eq!(decode(&[]), CounterState::default());
    }

    #[test]
    fn decodes_iso_values() {
        let state = decode(&[
            ("last_check_in", "2024-03-14T21:05:00"),
            ("today_cycles", "3"),
            ("week_cycles", "7"),
            ("month_cycles", "12"),
            ("last_reset_date", "2024-03-14"),
            ("last_recorded_today_cycles", "3"),
        ]);
        assert_eq!(
            state.last_check_in,
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap().and_hms_opt(21, 5, 0)
        );
        assert_eq!(state.today_cycles, 3);
        assert_eq!(state.week_cycles, 7);
        assert_eq!(state.month_cycles, 12);
        assert_eq!(state.last_reset_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(state.last_recorded_today_cycles, 3);
    }

    #[test]
    fn accepts_fractional_seconds_and_minute_precision() {
        let state = decode(&[("last_check_in", "2024-03-14T21:05:07.123")]);
        assert!(state.last_check_in.is_some());
        let state = decode(&[("last_check_in", "2024-03-14T21:05")]);
        assert!(state.last_check_in.is_some());
    }

    #[test]
    fn malformed_fields_fall_back_to_defaults() {
        let state = decode(&[
            ("last_check_in", "yesterday"),
            ("today_cycles", "-4"),
            ("week_cycles", "lots"),
            ("month_cycles", "5"),
            ("last_reset_date", "14/03/2024"),
        ]);
        assert_eq!(state.last_check_in, None);
        assert_eq!(state.today_cycles, 0);
        assert_eq!(state.week_cycles, 0);
        assert_eq!(state.month_cycles, 5);
        assert_eq!(state.last_reset_date, None);
    }

    #[test]
    fn absent_optionals_encode_as_removals() {
        let entries = CounterState::default().to_entries();
        let check_in = entries.iter().find(|(k, _)| *k == KEY_LAST_CHECK_IN).unwrap();
        assert_eq!(check_in.1, None);
        let today = entries.iter().find(|(k, _)| *k == KEY_TODAY_CYCLES).unwrap();
        assert_eq!(today.1.as_deref(), Some("0"));
    }

    #[test]
    fn checked_in_on_compares_dates() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let state = CounterState {
            last_check_in: day.and_hms_opt(23, 0, 0),
            ..Default::default()
        };
        assert!(state.checked_in_on(day));
        assert!(!state.checked_in_on(day.succ_opt().unwrap()));
        assert!(!CounterState::default().checked_in_on(day));
    }
}
