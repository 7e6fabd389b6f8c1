use anyhow::Result;
use clap::Parser;
use log::info;

use pharmatrack_feedback::cli::commands::{config_command, demo_command, simulate_command};
use pharmatrack_feedback::cli::{Cli, Commands};
use pharmatrack_feedback::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to file (truncated on each run); the demo owns the terminal
    logging::init(logging::LOG_FILE)?;

    let cli = Cli::parse();
    info!("Starting pharmatrack-feedback");

    match cli.command {
        Commands::Demo(args) => demo_command(args).await,
        Commands::Simulate(args) => simulate_command(args).await,
        Commands::Config(args) => config_command(args).await,
    }
}
