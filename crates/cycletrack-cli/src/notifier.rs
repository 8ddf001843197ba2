use cycletrack_core::error::Result;
use cycletrack_core::{Notifier, Reminder};

/// Prints reminders to stdout as one JSON line each.
#[derive(Debug, Clone, Copy)]
pub struct StdoutNotifier {
    granted: bool,
}

impl StdoutNotifier {
    /// `granted` is the `notifications.enabled` config value.
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

impl Notifier for StdoutNotifier {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn notify(&self, reminder: &Reminder) -> Result<()> {
        println!("{}", serde_json::to_string(reminder)?);
        Ok(())
    }
}
