use chrono::NaiveDateTime;
use clap::Subcommand;
use cycletrack_core::{Config, Widget};

use super::{open_reconciler, CommandResult};

#[derive(Subcommand)]
pub enum WidgetAction {
    /// Check in from the widget
    Tap,
    /// Redraw with today's count
    Refresh,
}

pub fn run(action: WidgetAction, now: NaiveDateTime) -> CommandResult {
    let config = Config::load()?;
    let reconciler = open_reconciler(&config)?;
    let widget = Widget::new(&reconciler);

    let view = match action {
        WidgetAction::Tap => widget.tap(now)?,
        WidgetAction::Refresh => widget.refresh(now)?,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
