use crate::config::EngineConfig;
use crate::ui::prompts::confirm;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use log::info;

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
    /// Write the default configuration to the config file
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn config_command(args: ConfigCommands) -> Result<()> {
    match args.command {
        ConfigSubcommands::Show => show_command(),
        ConfigSubcommands::Path => path_command(),
        ConfigSubcommands::Reset { force } => reset_command(force),
    }
}

fn show_command() -> Result<()> {
    let config = EngineConfig::load()?;
    let path = EngineConfig::get_config_path()?;

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not written yet, showing defaults)".dimmed());
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn path_command() -> Result<()> {
    println!("{}", EngineConfig::get_config_path()?.display());
    Ok(())
}

fn reset_command(force: bool) -> Result<()> {
    info!("Resetting engine config to defaults");

    if !force && !confirm("Reset the engine configuration to its default values?", false)? {
        println!("Operation cancelled.");
        return Ok(());
    }

    EngineConfig::default().save()?;
    println!("{}", "Configuration reset to defaults.".green());
    Ok(())
}
