//! Cycle calculator.
//!
//! A cycle is a fixed-length interval elapsed past the daily anchor time.
//! With the defaults (anchor 19:30, 30-minute cycles) a check-in at 20:31
//! counts 2 cycles and one at 23:59 counts 8. There is no daily cap.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default daily anchor hour.
pub const DEFAULT_ANCHOR_HOUR: u32 = 19;
/// Default daily anchor minute.
pub const DEFAULT_ANCHOR_MINUTE: u32 = 30;
/// Default cycle length in minutes.
pub const DEFAULT_CYCLE_MINUTES: u32 = 30;

/// Anchor time and cycle length used to count cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClock {
    pub anchor: NaiveTime,
    /// Cycle length in minutes. Always non-zero.
    pub cycle_minutes: u32,
}

impl CycleClock {
    /// Returns `None` when `cycle_minutes` is zero.
    pub fn new(anchor: NaiveTime, cycle_minutes: u32) -> Option<Self> {
        (cycle_minutes > 0).then_some(Self {
            anchor,
            cycle_minutes,
        })
    }

    /// The anchor instant on `day`.
    pub fn anchor_on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.anchor)
    }

    /// Whole cycles elapsed between the anchor on `today` and `now`.
    ///
    /// Returns 0 when `now` is at or before the anchor. Seconds are
    /// truncated to whole minutes before dividing.
    pub fn cycles(&self, today: NaiveDate, now: NaiveDateTime) -> u32 {
        let start = self.anchor_on(today);
        if now <= start {
            return 0;
        }
        let minutes = (now - start).num_minutes();
        let cycles = minutes / i64::from(self.cycle_minutes);
        u32::try_from(cycles).unwrap_or(u32::MAX)
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self {
            anchor: default_anchor(),
            cycle_minutes: DEFAULT_CYCLE_MINUTES,
        }
    }
}

/// 19:30.
pub fn default_anchor() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_ANCHOR_HOUR, DEFAULT_ANCHOR_MINUTE, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// Cycles elapsed since the default 19:30 anchor on `today`.
pub fn calculate_cycles(today: NaiveDate, now: NaiveDateTime) -> u32 {
    CycleClock::default().cycles(today, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn zero_before_and_at_anchor() {
        assert_eq!(calculate_cycles(day(), at(8, 0, 0)), 0);
        assert_eq!(calculate_cycles(day(), at(19, 29, 59)), 0);
        assert_eq!(calculate_cycles(day(), at(19, 30, 0)), 0);
    }

    #[test]
    fn partial_cycle_does_not_count() {
        assert_eq!(calculate_cycles(day(), at(19, 59, 59)), 0);
        assert_eq!(calculate_cycles(day(), at(20, 0, 0)), 1);
    }

    #[test]
    fn sixty_one_minutes_is_two_cycles() {
        assert_eq!(calculate_cycles(day(), at(20, 31, 0)), 2);
    }

    #[test]
    fn late_evening_is_uncapped() {
        assert_eq!(calculate_cycles(day(), at(23, 59, 0)), 8);
    }

    #[test]
    fn counts_past_midnight_against_reference_day() {
        let next_morning = day().succ_opt().unwrap().and_hms_opt(0, 30, 0).unwrap();
        assert_eq!(calculate_cycles(day(), next_morning), 10);
    }

    #[test]
    fn custom_clock_uses_its_own_anchor_and_length() {
        let clock = CycleClock::new(NaiveTime::from_hms_opt(6, 0, 0).unwrap(), 15).unwrap();
        assert_eq!(clock.cycles(day(), at(7, 0, 0)), 4);
        assert_eq!(clock.cycles(day(), at(5, 0, 0)), 0);
    }

    #[test]
    fn zero_length_clock_is_rejected() {
        assert!(CycleClock::new(default_anchor(), 0).is_none());
    }

    proptest! {
        #[test]
        fn matches_floor_of_minutes_over_thirty(minutes in 1i64..(60 * 24 * 3)) {
            let now = at(19, 30, 0) + chrono::Duration::minutes(minutes);
            prop_assert_eq!(calculate_cycles(day(), now) as i64, minutes / 30);
        }

        #[test]
        fn never_positive_before_anchor(minutes in 0i64..(60 * 24 * 3)) {
            let now = at(19, 30, 0) - chrono::Duration::minutes(minutes);
            prop_assert_eq!(calculate_cycles(day(), now), 0);
        }
    }
}
