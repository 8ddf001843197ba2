//! Home-screen widget surface.
//!
//! A tap checks in through the shared reconciler; a refresh runs the
//! passive pass so a stale count from yesterday is never shown.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::state::CounterState;
use crate::storage::StateStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetView {
    pub today_cycles: u32,
    pub label: String,
}

impl WidgetView {
    pub fn render(state: &CounterState) -> Self {
        Self {
            today_cycles: state.today_cycles,
            label: format!("Today's Cycles: {}", state.today_cycles),
        }
    }
}

pub struct Widget<'a, S> {
    reconciler: &'a Reconciler<S>,
}

impl<'a, S: StateStore> Widget<'a, S> {
    pub fn new(reconciler: &'a Reconciler<S>) -> Self {
        Self { reconciler }
    }

    /// Check in and render the result.
    pub fn tap(&self, now: NaiveDateTime) -> Result<WidgetView> {
        let outcome = self.reconciler.check_in(now)?;
        Ok(WidgetView::render(&outcome.state))
    }

    /// Reconcile and render.
    pub fn refresh(&self, now: NaiveDateTime) -> Result<WidgetView> {
        let outcome = self.reconciler.reconcile(now)?;
        Ok(WidgetView::render(&outcome.state))
    }
}
