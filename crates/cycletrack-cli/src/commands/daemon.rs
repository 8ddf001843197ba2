//! Foreground job runner.
//!
//! Registers every job, then sleeps until the next one is due and runs a
//! scheduler tick. Stops on Ctrl-C.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use cycletrack_core::jobs::JobContext;
use cycletrack_core::scheduler::tick;
use cycletrack_core::{Config, JobBook, LogNotifier, Notifier};
use tracing::{info, warn};

use super::{open_reconciler, CommandResult};
use crate::notifier::StdoutNotifier;

/// Upper bound on one sleep, so wall-clock jumps are noticed.
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// `log_reminders` sends reminders to the log instead of stdout.
pub fn run(log_reminders: bool) -> CommandResult {
    let config = Config::load()?;
    let reminder_time = config.reminder_time()?;
    let reconciler = open_reconciler(&config)?;
    let granted = config.notifications.enabled;
    let notifier: Box<dyn Notifier> = if log_reminders {
        Box::new(LogNotifier::new(granted))
    } else {
        Box::new(StdoutNotifier::new(granted))
    };
    let ctx = JobContext {
        reconciler: &reconciler,
        notifier: notifier.as_ref(),
        reminder_threshold: config.reminder_threshold()?,
    };

    let now = Local::now().naive_local();
    reconciler.reconcile(now)?;

    let db = reconciler.store();
    let mut book = JobBook::load(db)?;
    for registration in book.register_all(now, reminder_time) {
        info!(event = ?registration.event(), outcome = ?registration.outcome, "job registered");
    }
    book.save(db)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let now = Local::now().naive_local();
            let wait = match tick(&ctx, now) {
                Ok((book, reports)) => {
                    for report in &reports {
                        println!("{}", serde_json::to_string(report)?);
                    }
                    sleep_until(book.next_wake(), now)
                }
                Err(e) => {
                    warn!(error = %e, "scheduler tick failed");
                    MAX_SLEEP
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

fn sleep_until(next_wake: Option<NaiveDateTime>, now: NaiveDateTime) -> Duration {
    next_wake
        .and_then(|next| (next - now).to_std().ok())
        .map_or(MAX_SLEEP, |wait| wait.min(MAX_SLEEP))
}
