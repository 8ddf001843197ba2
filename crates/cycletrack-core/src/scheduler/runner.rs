use chrono::NaiveDateTime;

use super::JobBook;
use crate::error::Result;
use crate::jobs::{run_job, JobContext, JobReport};
use crate::notify::Notifier;
use crate::storage::{Database, StateStore};

/// Run every job due at `now` and advance its schedule.
///
/// A failed job still advances; its work is picked up by the next firing
/// or the next foreground reconcile.
pub fn run_due<S, N>(book: &mut JobBook, ctx: &JobContext<'_, S, N>, now: NaiveDateTime) -> Vec<JobReport>
where
    S: StateStore,
    N: Notifier + ?Sized,
{
    book.due(now)
        .into_iter()
        .map(|job| {
            let report = run_job(job, ctx, now);
            book.mark_fired(job, now);
            report
        })
        .collect()
}

/// One scheduler pass against the database: reload the book, run what is
/// due and persist the advanced schedule.
///
/// The book is read fresh on every pass, so a schedule written by another
/// process in the meantime is honored rather than overwritten. Returns the
/// book as saved, for computing the next wake-up.
pub fn tick<N>(ctx: &JobContext<'_, Database, N>, now: NaiveDateTime) -> Result<(JobBook, Vec<JobReport>)>
where
    N: Notifier + ?Sized,
{
    let db = ctx.reconciler.store();
    let mut book = JobBook::load(db)?;
    let reports = run_due(&mut book, ctx, now);
    if !reports.is_empty() {
        book.save(db)?;
    }
    Ok((book, reports))
}
