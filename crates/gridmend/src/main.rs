//! Gridmend - oracle-guided infrastructure repair coordination

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::{init_command, run_command, status_command};

/// Gridmend - repair coordination for your terminal
#[derive(Parser)]
#[command(name = "gridmend")]
#[command(about = "Oracle-guided infrastructure repair coordination")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and runs directory
    Init,
    /// Execute one repair run
    Run {
        /// Step budget, overrides the configured default
        #[arg(short, long)]
        max_steps: Option<u32>,
        /// World seed file (JSON), defaults to the built-in scenario
        #[arg(short, long)]
        seed: Option<PathBuf>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show system status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Run { verbose: true, .. }) {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt::init();
    }

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Run {
            max_steps,
            seed,
            verbose: _,
        } => match run_command(max_steps, seed).await {
            Ok(true) => {}
            Ok(false) => {
                // budget ran out before FINAL
                std::process::exit(1);
            }
            Err(e) => {
                error!("Run failed: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
