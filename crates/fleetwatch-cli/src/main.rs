//! CLI for fleetwatch: live terminal map of a USV fleet.

mod commands;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(about = "fleetwatch: live terminal map of an autonomous surface vehicle fleet")]
#[command(version = fleetwatch_core::VERSION)]
struct Cli {
    /// Backend base URL (default: $FLEETWATCH_BACKEND or http://127.0.0.1:8000)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live interactive fleet map (TUI)
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Log file offered to the backend when pressing 'u'
        #[arg(long)]
        upload: Option<PathBuf>,

        /// Directory for snapshot exports and recordings
        #[arg(long, default_value = "recordings")]
        output: PathBuf,
    },

    /// Poll the backend once and print the fleet
    Fetch {
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Headless poll loop: print fleet changes and simulation end events until Ctrl+C
    Follow {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Record every committed snapshot under this directory
        #[arg(long)]
        record: Option<PathBuf>,

        /// Note stored in the recording's session.json
        #[arg(long)]
        note: Option<String>,
    },

    /// Start the backend simulation
    Start,

    /// Stop the backend simulation
    Stop,

    /// Set the backend playback speed multiplier
    Speed {
        #[arg(value_parser = ["1", "2", "5", "10"])]
        multiplier: String,
    },

    /// Upload a fleet log file for playback
    Upload {
        /// Path to a JSONL log file
        path: PathBuf,
    },
}

fn init_logging(log_file: Option<&PathBuf>, quiet_without_file: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match log_file {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        // The TUI owns the terminal; stderr output would tear the screen.
        None if quiet_without_file => {
            builder.filter_level(log::LevelFilter::Off);
        }
        None => {}
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(
        cli.log_file.as_ref(),
        matches!(cli.command, Commands::Watch { .. }),
    );
    let backend = cli.backend.as_deref();

    match cli.command {
        Commands::Watch {
            interval_ms,
            upload,
            output,
        } => commands::watch::run(commands::watch::WatchCommandConfig {
            backend,
            interval_ms,
            upload,
            output_dir: output,
        }),
        Commands::Fetch { json } => commands::fetch::run(backend, json),
        Commands::Follow {
            interval_ms,
            record,
            note,
        } => commands::follow::run(backend, interval_ms, record, note),
        Commands::Start => commands::control::run(backend, fleetwatch_core::Command::Start),
        Commands::Stop => commands::control::run(backend, fleetwatch_core::Command::Stop),
        Commands::Speed { multiplier } => {
            let speed = commands::parse_speed(&multiplier);
            commands::control::run(backend, fleetwatch_core::Command::SetSpeed(speed))
        }
        Commands::Upload { path } => {
            commands::control::run(backend, fleetwatch_core::Command::Upload(path))
        }
    }
}
