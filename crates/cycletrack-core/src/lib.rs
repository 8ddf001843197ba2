//! # cycletrack Core Library
//!
//! This library provides the core logic for cycletrack, a personal
//! check-in tracker. A check-in counts the whole 30-minute cycles elapsed
//! since a daily 19:30 anchor and accumulates them into day, week and month
//! totals. All operations are available through the standalone CLI binary.
//!
//! ## Architecture
//!
//! - **Cycle calculator**: pure (anchor, now) → cycle count
//! - **Reset policy**: pure day/week/month boundary predicates
//! - **Reconciler**: the single writer of the persisted [`CounterState`],
//!   shared by the app surface, the widget and the scheduled jobs
//! - **Scheduler**: a persisted job book of reset and reminder jobs
//! - **Storage**: SQLite key-value storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Reconciler`]: load → reset → check-in delta → save
//! - [`JobBook`]: one recurring schedule per job name
//! - [`Database`]: SQLite-backed [`StateStore`]
//! - [`Config`]: application configuration management

pub mod cycles;
pub mod error;
pub mod events;
pub mod jobs;
pub mod notify;
pub mod reconciler;
pub mod reset;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod widget;

pub use cycles::{calculate_cycles, CycleClock};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use jobs::{run_job, should_remind, JobContext, JobReport, JobStatus};
pub use notify::{LogNotifier, Notifier, RecordingNotifier, Reminder};
pub use reconciler::{Reconciler, Reconciliation};
pub use reset::{should_reset_daily, should_reset_monthly, should_reset_weekly, ResetSet};
pub use scheduler::{ExistingPolicy, JobBook, JobName, JobSpec, Registration, RegistrationOutcome};
pub use state::CounterState;
pub use storage::{Config, Database, MemoryStore, StateStore};
pub use widget::{Widget, WidgetView};
