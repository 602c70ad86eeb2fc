//! StageList CLI
//!
//! Command-line tools for schedule lists kept in a file store.
//!
//! # Commands
//!
//! - `inspect` - Display the committed schedules
//! - `apply` - Stage a batch of operations and commit them atomically
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// StageList command-line tools.
#[derive(Parser)]
#[command(name = "stagelist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the committed schedules
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Stage operations from a JSON file and commit them as one transaction
    Apply {
        /// Schedule limits of the device (JSON)
        #[arg(short, long)]
        limits: PathBuf,

        /// Operations to stage (JSON array)
        #[arg(short, long)]
        ops: PathBuf,

        /// Give new schedules a device-assigned handle
        #[arg(short, long)]
        assign_handles: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let store = cli.store.ok_or("Store path required for inspect")?;
            commands::inspect::run(&store, &format)?;
        }
        Commands::Apply {
            limits,
            ops,
            assign_handles,
        } => {
            let store = cli.store.ok_or("Store path required for apply")?;
            let status = commands::apply::run(&store, &limits, &ops, assign_handles)?;
            println!("{status}");
            if !status.is_success() {
                return Err(commands::CliError::Failed(status).into());
            }
        }
        Commands::Version => {
            println!("StageList CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("StageList Core v{}", stagelist_core::VERSION);
        }
    }

    Ok(())
}
