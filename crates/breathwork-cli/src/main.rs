use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod player;

#[derive(Parser)]
#[command(name = "breathwork", version, about = "Breathwork CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Breathing techniques and duration presets
    Technique {
        #[command(subcommand)]
        action: commands::technique::TechniqueAction,
    },
    /// Run a guided breathing session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Streak, totals and resumable session
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so JSON on stdout stays parseable.
/// `BREATHWORK_LOG` takes an EnvFilter directive; the default is `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("BREATHWORK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Technique { action } => commands::technique::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Progress { action } => commands::progress::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
