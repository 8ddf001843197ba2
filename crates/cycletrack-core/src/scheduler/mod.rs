//! Scheduling of reset and reminder jobs.
//!
//! Each job has a name, a first run computed from "now" (next midnight,
//! next Monday midnight, first of next month, next reminder time) and a
//! fixed repeat period. The [`JobBook`] keeps at most one schedule per job
//! name; registering again either keeps the existing schedule or replaces
//! it, depending on the job.

mod book;
mod runner;

pub use book::{JobBook, Registration, RegistrationOutcome, ScheduledJob};
pub use runner::{run_due, tick};

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What to do when a job with the same name is already scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    Keep,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobName {
    #[serde(rename = "daily_reset_work")]
    DailyReset,
    #[serde(rename = "weekly_reset_work")]
    WeeklyReset,
    #[serde(rename = "monthly_reset_work")]
    MonthlyReset,
    #[serde(rename = "notification_work")]
    Reminder,
}

impl JobName {
    pub const ALL: [JobName; 4] = [
        JobName::DailyReset,
        JobName::WeeklyReset,
        JobName::MonthlyReset,
        JobName::Reminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::DailyReset => "daily_reset_work",
            JobName::WeeklyReset => "weekly_reset_work",
            JobName::MonthlyReset => "monthly_reset_work",
            JobName::Reminder => "notification_work",
        }
    }

    pub fn period(&self) -> Duration {
        match self {
            JobName::DailyReset | JobName::Reminder => Duration::hours(24),
            JobName::WeeklyReset => Duration::days(7),
            // Approximate; the first run lands on the 1st.
            JobName::MonthlyReset => Duration::days(30),
        }
    }

    pub fn policy(&self) -> ExistingPolicy {
        match self {
            JobName::Reminder => ExistingPolicy::Replace,
            _ => ExistingPolicy::Keep,
        }
    }

    /// First run at or after `now`.
    pub fn first_run(&self, now: NaiveDateTime, reminder_time: NaiveTime) -> NaiveDateTime {
        match self {
            JobName::DailyReset => next_daily_at(now, NaiveTime::MIN),
            JobName::WeeklyReset => next_monday_midnight(now),
            JobName::MonthlyReset => next_month_start(now),
            JobName::Reminder => next_daily_at(now, reminder_time),
        }
    }

    pub fn spec(&self, now: NaiveDateTime, reminder_time: NaiveTime) -> JobSpec {
        JobSpec {
            name: *self,
            first_run: self.first_run(now, reminder_time),
            period: self.period(),
            policy: self.policy(),
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        let name = match normalized.as_str() {
            "daily_reset_work" | "daily_reset" | "daily" => JobName::DailyReset,
            "weekly_reset_work" | "weekly_reset" | "weekly" => JobName::WeeklyReset,
            "monthly_reset_work" | "monthly_reset" | "monthly" => JobName::MonthlyReset,
            "notification_work" | "reminder" => JobName::Reminder,
            _ => return Err(ValidationError::UnknownJob(s.to_string())),
        };
        Ok(name)
    }
}

/// A request to schedule a recurring job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: JobName,
    pub first_run: NaiveDateTime,
    pub period: Duration,
    pub policy: ExistingPolicy,
}

/// Next occurrence of `time` at or after `now`.
pub fn next_daily_at(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if now > today {
        today + Duration::days(1)
    } else {
        today
    }
}

/// Next Monday 00:00 at or after `now`.
pub fn next_monday_midnight(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let days_until = (7 - today.weekday().num_days_from_monday()) % 7;
    let candidate = (today + Duration::days(i64::from(days_until))).and_time(NaiveTime::MIN);
    if now > candidate {
        candidate + Duration::days(7)
    } else {
        candidate
    }
}

/// Next first-of-month 00:00 at or after `now`.
pub fn next_month_start(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let this_month = first_of_month(today.year(), today.month());
    if now <= this_month.and_time(NaiveTime::MIN) {
        return this_month.and_time(NaiveTime::MIN);
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    first_of_month(year, month).and_time(NaiveTime::MIN)
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}
