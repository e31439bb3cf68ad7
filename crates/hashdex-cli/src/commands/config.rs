//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Create a local configuration file
//! - Show configuration file paths

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use hashdex_config::ConfigLoader;
use serde::Serialize;

use super::{load_config, print_info};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Create .hashdex/config.toml in the current directory
    Init,

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Where configuration is looked up, and what exists there
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub local: PathBuf,
    pub global_exists: bool,
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Init => execute_init(global),
        ConfigCommand::Path(args) => execute_path(args),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        print!("{}", toml);
    }

    Ok(())
}

fn execute_init(global: GlobalOptions) -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let path = loader.local_config_path(&root);
    if path.exists() {
        print_info(
            &format!("Config already exists at {}", path.display()),
            global.quiet,
        );
        return Ok(());
    }

    let path = loader.init_local(&root)?;
    println!("Created {}", path.display());
    Ok(())
}

fn execute_path(args: PathArgs) -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&root);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    let found = |exists: bool| if exists { "exists" } else { "not found" };
    match paths.global {
        Some(ref path) => println!(
            "global  {} ({})",
            path.display(),
            found(paths.global_exists)
        ),
        None => println!("global  unavailable (no home directory)"),
    }
    println!(
        "local   {} ({})",
        paths.local.display(),
        found(paths.local_exists)
    );

    Ok(())
}
