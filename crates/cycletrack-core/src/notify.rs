//! Reminder notifications.
//!
//! Posting a notification needs a permission the core cannot request; the
//! [`Notifier`] reports whether it has one and the reminder job skips
//! emission when it does not.

use std::sync::Mutex;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// A user-visible reminder with fixed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    pub body: String,
}

impl Reminder {
    pub fn for_anchor(anchor: NaiveTime) -> Self {
        Self {
            title: "Check-in reminder".to_string(),
            body: format!(
                "No check-in recorded after {} today.",
                anchor.format("%H:%M")
            ),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn permission_granted(&self) -> bool;

    fn notify(&self, reminder: &Reminder) -> Result<()>;
}

/// Emits reminders as log records.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    granted: bool,
}

impl LogNotifier {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

impl Notifier for LogNotifier {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn notify(&self, reminder: &Reminder) -> Result<()> {
        info!(title = %reminder.title, body = %reminder.body, "reminder");
        Ok(())
    }
}

/// Keeps every reminder it is given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    granted: bool,
    sent: Mutex<Vec<Reminder>>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            granted: true,
            sent: Mutex::default(),
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Reminder> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn notify(&self, reminder: &Reminder) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reminder.clone());
        Ok(())
    }
}
