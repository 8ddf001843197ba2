//! The job book: one recurring schedule per job name.
//!
//! Persisted as JSON under a single key so schedules survive restarts.
//! Registering on every launch is safe: `Keep` jobs are left alone and
//! `Replace` jobs are overwritten, never duplicated.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ExistingPolicy, JobName, JobSpec};
use crate::error::Result;
use crate::events::Event;
use crate::storage::Database;

const BOOK_KEY: &str = "scheduled_jobs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub name: JobName,
    pub next_run: NaiveDateTime,
    /// Repeat period in seconds.
    pub period_secs: i64,
    pub registered_at: NaiveDateTime,
    #[serde(default)]
    pub last_run: Option<NaiveDateTime>,
}

impl ScheduledJob {
    pub fn period(&self) -> Duration {
        Duration::try_seconds(self.period_secs)
            .filter(|p| *p > Duration::zero())
            .unwrap_or_else(|| self.name.period())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationOutcome {
    Created,
    Kept,
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub job: JobName,
    pub next_run: NaiveDateTime,
    pub outcome: RegistrationOutcome,
}

impl Registration {
    pub fn event(&self) -> Event {
        Event::JobRegistered {
            job: self.job,
            next_run: self.next_run,
            replaced: self.outcome == RegistrationOutcome::Replaced,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBook {
    jobs: Vec<ScheduledJob>,
}

impl JobBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn get(&self, name: JobName) -> Option<&ScheduledJob> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Add `spec`, honoring its policy if the job already exists.
    pub fn register(&mut self, spec: JobSpec, now: NaiveDateTime) -> Registration {
        let fresh = ScheduledJob {
            name: spec.name,
            next_run: spec.first_run,
            period_secs: spec.period.num_seconds().max(1),
            registered_at: now,
            last_run: None,
        };

        let (next_run, outcome) = match self.jobs.iter_mut().find(|j| j.name == spec.name) {
            Some(existing) if spec.policy == ExistingPolicy::Keep => {
                (existing.next_run, RegistrationOutcome::Kept)
            }
            Some(existing) => {
                *existing = fresh;
                (existing.next_run, RegistrationOutcome::Replaced)
            }
            None => {
                let next_run = fresh.next_run;
                self.jobs.push(fresh);
                (next_run, RegistrationOutcome::Created)
            }
        };
        debug!(job = %spec.name, %next_run, ?outcome, "registered job");

        Registration {
            job: spec.name,
            next_run,
            outcome,
        }
    }

    /// Register every known job.
    pub fn register_all(&mut self, now: NaiveDateTime, reminder_time: NaiveTime) -> Vec<Registration> {
        JobName::ALL
            .iter()
            .map(|job| self.register(job.spec(now, reminder_time), now))
            .collect()
    }

    /// Jobs whose next run is at or before `now`, earliest first.
    pub fn due(&self, now: NaiveDateTime) -> Vec<JobName> {
        let mut due: Vec<&ScheduledJob> = self.jobs.iter().filter(|j| j.next_run <= now).collect();
        due.sort_by_key(|j| (j.next_run, j.name));
        due.into_iter().map(|j| j.name).collect()
    }

    /// Record a firing and move the next run past `now` by whole periods.
    ///
    /// Firings missed while nothing was running collapse into this one.
    pub fn mark_fired(&mut self, name: JobName, now: NaiveDateTime) {
        let Some(job) = self.jobs.iter_mut().find(|j| j.name == name) else {
            return;
        };
        let period_secs = job.period().num_seconds().max(1);
        let behind = (now - job.next_run).num_seconds();
        if behind >= 0 {
            let skip = behind / period_secs + 1;
            let next = skip
                .checked_mul(period_secs)
                .and_then(Duration::try_seconds)
                .and_then(|advance| job.next_run.checked_add_signed(advance));
            job.next_run = match next {
                Some(next) => next,
                None => {
                    warn!(job = %name, "schedule overflowed, restarting from now");
                    now + name.period()
                }
            };
        }
        job.last_run = Some(now);
    }

    /// Earliest pending run.
    pub fn next_wake(&self) -> Option<NaiveDateTime> {
        self.jobs.iter().map(|j| j.next_run).min()
    }

    /// Load the book from `db`. A malformed book is discarded; a stored
    /// period that differs from the job's own is replaced by it.
    pub fn load(db: &Database) -> Result<Self> {
        let Some(json) = db.kv_get(BOOK_KEY)? else {
            return Ok(Self::new());
        };
        match serde_json::from_str::<Self>(&json) {
            Ok(mut book) => {
                book.repair_periods();
                Ok(book)
            }
            Err(e) => {
                warn!(error = %e, "discarding malformed job book");
                Ok(Self::new())
            }
        }
    }

    fn repair_periods(&mut self) {
        for job in &mut self.jobs {
            let expected = job.name.period().num_seconds();
            if job.period_secs != expected {
                warn!(job = %job.name, stored = job.period_secs, expected, "resetting stored job period");
                job.period_secs = expected;
            }
        }
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        let json = serde_json::to_string(self)?;
        db.kv_set(BOOK_KEY, &json)?;
        info!(jobs = self.jobs.len(), "saved job book");
        Ok(())
    }
}
