//! Scheduled job bodies.
//!
//! Reset jobs run the reconciler's passive pass, the same routine the app
//! and widget use, so a scheduled reset and a foreground reset can never
//! disagree. The reminder job is a stateless guard over the stored state.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::notify::{Notifier, Reminder};
use crate::reconciler::Reconciler;
use crate::scheduler::JobName;
use crate::state::CounterState;
use crate::storage::StateStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: JobName,
    pub ran_at: NaiveDateTime,
    #[serde(flatten)]
    pub status: JobStatus,
    pub events: Vec<Event>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Everything a job needs to run.
pub struct JobContext<'a, S, N: ?Sized> {
    pub reconciler: &'a Reconciler<S>,
    pub notifier: &'a N,
    /// Reminders are only emitted after this time of day.
    pub reminder_threshold: NaiveTime,
}

/// True when nothing was checked in today and `now` is past `threshold`.
pub fn should_remind(state: &CounterState, now: NaiveDateTime, threshold: NaiveTime) -> bool {
    !state.checked_in_on(now.date()) && now.time() > threshold
}

/// Run one job at `now`. Never panics; failures are reported in the status.
pub fn run_job<S, N>(job: JobName, ctx: &JobContext<'_, S, N>, now: NaiveDateTime) -> JobReport
where
    S: StateStore,
    N: Notifier + ?Sized,
{
    let result = match job {
        JobName::DailyReset | JobName::WeeklyReset | JobName::MonthlyReset => ctx
            .reconciler
            .reconcile(now)
            .map(|r| r.events)
            .map_err(|e| e.to_string()),
        JobName::Reminder => run_reminder(ctx, now),
    };

    let (status, events) = match result {
        Ok(events) => (JobStatus::Success, events),
        Err(reason) => {
            warn!(%job, %reason, "job failed");
            (JobStatus::Failure { reason }, Vec::new())
        }
    };
    JobReport {
        job,
        ran_at: now,
        status,
        events,
    }
}

fn run_reminder<S, N>(ctx: &JobContext<'_, S, N>, now: NaiveDateTime) -> Result<Vec<Event>, String>
where
    S: StateStore,
    N: Notifier + ?Sized,
{
    let state = ctx
        .reconciler
        .store()
        .load()
        .map_err(|e| e.to_string())?;

    if !should_remind(&state, now, ctx.reminder_threshold) {
        debug!(
            checked_in_today = state.checked_in_on(now.date()),
            "reminder conditions not met"
        );
        return Ok(Vec::new());
    }

    if !ctx.notifier.permission_granted() {
        debug!("notification permission not granted, skipping reminder");
        return Ok(vec![Event::ReminderSuppressed { at: now }]);
    }

    let reminder = Reminder::for_anchor(ctx.reconciler.clock().anchor);
    ctx.notifier
        .notify(&reminder)
        .map_err(|e| e.to_string())?;
    info!("reminder sent");
    Ok(vec![Event::ReminderSent { at: now }])
}
