//! Integration tests for the job book and job runner.
//!
//! Simulates a daemon that is restarted several times and sleeps through
//! some firings, checking that schedules are never duplicated and that the
//! reset jobs keep the counters consistent with foreground check-ins.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use cycletrack_core::jobs::JobContext;
use cycletrack_core::scheduler::run_due;
use cycletrack_core::{
    CycleClock, Database, Event, JobBook, JobName, Reconciler, RecordingNotifier,
    RegistrationOutcome, StateStore,
};

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn eight_pm() -> NaiveTime {
    NaiveTime::from_hms_opt(20, 0, 0).unwrap()
}

fn threshold() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 30, 0).unwrap()
}

#[test]
fn test_restarts_do_not_duplicate_jobs() {
    let db = Database::open_memory().unwrap();
    for hour in [9, 10, 11] {
        let mut book = JobBook::load(&db).unwrap();
        book.register_all(at(14, hour, 0), eight_pm());
        book.save(&db).unwrap();
    }
    let book = JobBook::load(&db).unwrap();
    assert_eq!(book.jobs().len(), 4);
    assert_eq!(book.get(JobName::DailyReset).unwrap().registered_at, at(14, 9, 0));
    assert_eq!(book.get(JobName::Reminder).unwrap().registered_at, at(14, 11, 0));
}

#[test]
fn test_reminder_schedule_follows_config_change() {
    let db = Database::open_memory().unwrap();
    let mut book = JobBook::new();
    book.register_all(at(14, 9, 0), eight_pm());
    book.save(&db).unwrap();

    let mut book = JobBook::load(&db).unwrap();
    let later = NaiveTime::from_hms_opt(21, 30, 0).unwrap();
    let regs = book.register_all(at(14, 9, 30), later);
    let reminder = regs.iter().find(|r| r.job == JobName::Reminder).unwrap();
    assert_eq!(reminder.outcome, RegistrationOutcome::Replaced);
    assert_eq!(reminder.next_run, at(14, 21, 30));
}

#[test]
fn test_two_days_of_jobs_and_check_ins() {
    let reconciler = Reconciler::new(Database::open_memory().unwrap(), CycleClock::default());
    let notifier = RecordingNotifier::granted();
    let ctx = JobContext {
        reconciler: &reconciler,
        notifier: &notifier,
        reminder_threshold: threshold(),
    };
    let mut book = JobBook::new();
    book.register_all(at(14, 9, 0), eight_pm());

    // Day 1: user checks in at 21:00, after the reminder already fired.
    let reports = run_due(&mut book, &ctx, at(14, 20, 0));
    assert_eq!(reports[0].events, vec![Event::ReminderSent { at: at(14, 20, 0) }]);
    reconciler.check_in(at(14, 21, 0)).unwrap();

    // Midnight: the daily reset job zeroes today's count.
    let reports = run_due(&mut book, &ctx, at(15, 0, 0));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].job, JobName::DailyReset);
    let state = reconciler.store().load().unwrap();
    assert_eq!(state.today_cycles, 0);
    assert_eq!(state.week_cycles, 3);

    // Day 2: check-in before the reminder silences it.
    reconciler.check_in(at(15, 19, 50)).unwrap();
    let reports = run_due(&mut book, &ctx, at(15, 20, 0));
    assert!(reports[0].events.is_empty());
    assert_eq!(notifier.sent().len(), 1);

    // A later check-in the same day adds only the new cycles.
    let out = reconciler.check_in(at(15, 20, 45)).unwrap();
    assert_eq!(out.delta, 2);
    assert_eq!(out.state.week_cycles, 5);
}
