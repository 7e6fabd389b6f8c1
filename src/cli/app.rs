use super::commands::config::ConfigCommands;
use super::commands::demo::DemoCommands;
use super::commands::simulate::SimulateCommands;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pharmatrack-feedback")]
#[command(about = "Progress, filter and suggestion feedback engine for the supply-chain console")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive shipment list demo
    Demo(DemoCommands),
    /// Print a simulated progress lifecycle as JSON lines
    Simulate(SimulateCommands),
    /// Engine configuration management
    Config(ConfigCommands),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::config::ConfigSubcommands;

    #[test]
    fn test_parses_simulate_flags() {
        let cli = Cli::try_parse_from(["pharmatrack-feedback", "simulate", "--resolve-after", "800"]).unwrap();
        match cli.command {
            Commands::Simulate(args) => assert_eq!(args.resolve_after, 800),
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_parses_config_subcommand() {
        let cli = Cli::try_parse_from(["pharmatrack-feedback", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands {
                command: ConfigSubcommands::Path
            })
        ));
    }
}
