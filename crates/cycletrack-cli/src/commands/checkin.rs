use std::io::{self, BufRead, IsTerminal, Write};

use chrono::NaiveDateTime;
use cycletrack_core::Config;

use super::{open_reconciler, CommandResult};

pub fn check_in(now: NaiveDateTime) -> CommandResult {
    let config = Config::load()?;
    let reconciler = open_reconciler(&config)?;
    let outcome = reconciler.check_in(now)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

pub fn status(now: NaiveDateTime) -> CommandResult {
    let config = Config::load()?;
    let reconciler = open_reconciler(&config)?;
    let outcome = reconciler.reconcile(now)?;
    println!("{}", serde_json::to_string_pretty(&outcome.state)?);
    Ok(())
}

/// Clear every record. Without `yes`, asks on an interactive terminal and
/// refuses otherwise.
pub fn clear(now: NaiveDateTime, yes: bool) -> CommandResult {
    if !yes && !confirm("Clear all records? This cannot be undone. [y/N] ")? {
        return Err("clear not confirmed (pass --yes to skip the prompt)".into());
    }
    let config = Config::load()?;
    let reconciler = open_reconciler(&config)?;
    let outcome = reconciler.clear_all(now)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(false);
    }
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
