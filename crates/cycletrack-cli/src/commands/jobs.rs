use chrono::NaiveDateTime;
use clap::Subcommand;
use cycletrack_core::jobs::{run_job, JobContext, JobStatus};
use cycletrack_core::{Config, JobBook, JobName};

use super::{open_reconciler, CommandResult};
use crate::notifier::StdoutNotifier;

#[derive(Subcommand)]
pub enum JobsAction {
    /// Register every job, keeping or replacing existing schedules
    Schedule,
    /// Print the job book as JSON
    List,
    /// Run one job now without touching its schedule
    Run {
        /// Job name (e.g. "daily_reset_work", "notification_work")
        name: JobName,
    },
}

pub fn run(action: JobsAction, now: NaiveDateTime) -> CommandResult {
    let config = Config::load()?;
    let reconciler = open_reconciler(&config)?;
    let db = reconciler.store();

    match action {
        JobsAction::Schedule => {
            let mut book = JobBook::load(db)?;
            let registrations = book.register_all(now, config.reminder_time()?);
            book.save(db)?;
            println!("{}", serde_json::to_string_pretty(&registrations)?);
        }
        JobsAction::List => {
            let book = JobBook::load(db)?;
            println!("{}", serde_json::to_string_pretty(book.jobs())?);
        }
        JobsAction::Run { name } => {
            let notifier = StdoutNotifier::new(config.notifications.enabled);
            let ctx = JobContext {
                reconciler: &reconciler,
                notifier: &notifier,
                reminder_threshold: config.reminder_threshold()?,
            };
            let report = run_job(name, &ctx, now);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let JobStatus::Failure { reason } = report.status {
                return Err(format!("{name} failed: {reason}").into());
            }
        }
    }
    Ok(())
}
