use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod notifier;

#[derive(Parser)]
#[command(name = "cycletrack", version, about = "Check-in cycle tracker")]
struct Cli {
    /// Evaluate at this local time instead of now (YYYY-MM-DDTHH:MM[:SS])
    #[arg(long, global = true, value_parser = commands::parse_at)]
    at: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check in and print the reconciliation as JSON
    CheckIn,
    /// Apply pending resets and print the counter state as JSON
    Status,
    /// Clear all records
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Home-screen widget surface
    Widget {
        #[command(subcommand)]
        action: commands::widget::WidgetAction,
    },
    /// Scheduled reset and reminder jobs
    Jobs {
        #[command(subcommand)]
        action: commands::jobs::JobsAction,
    },
    /// Run due jobs until interrupted
    Daemon {
        /// Send reminders to the log instead of stdout
        #[arg(long)]
        log_reminders: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CYCLETRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let now = commands::now(cli.at);
    let result = match cli.command {
        Commands::CheckIn => commands::checkin::check_in(now),
        Commands::Status => commands::checkin::status(now),
        Commands::Clear { yes } => commands::checkin::clear(now, yes),
        Commands::Widget { action } => commands::widget::run(action, now),
        Commands::Jobs { action } => commands::jobs::run(action, now),
        Commands::Daemon { log_reminders } => commands::daemon::run(log_reminders),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
