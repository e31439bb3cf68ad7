//! Hashdex CLI - inspect and reconcile search indexes over Redis hashes
//!
//! Works on the document types declared in the `[[documents]]` table of the
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! # Show resolved field kinds and fingerprints (no server needed)
//! hashdex schema
//!
//! # Bring every declared index in line with its schema
//! hashdex reconcile
//!
//! # Run a native query against one type
//! hashdex search cars "@year:[2000 +inf]" --page-size 20
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use hashdex_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

/// Hashdex - typed search indexes over Redis hashes
#[derive(Parser, Debug)]
#[command(name = "hashdex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to a configuration file (skips global/local discovery)
    #[arg(long, short = 'c', global = true, env = "HASHDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Redis server URL
    #[arg(long, global = true, env = "HASHDEX_URL")]
    url: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> hashdex_config::ConfigOverrides {
        hashdex_config::ConfigOverrides {
            store_url: self.url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or rebuild indexes whose schema changed
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Show stored index records against the declared schemas
    Status(commands::status::StatusArgs),

    /// Show resolved field kinds and fingerprints
    Schema(commands::schema::SchemaArgs),

    /// Run a native query against a document type
    Search(commands::search::SearchArgs),

    /// List stored document ids of a type
    List(commands::list::ListArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level; `-v`/`-q` win over both.
fn init_tracing(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config when it loads; a broken config
    // is reported by the command itself
    let logging = commands::load_config(&cli.global)
        .map(|c| c.logging)
        .unwrap_or_default();
    init_tracing(&cli.global, &logging)?;

    match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args, cli.global).await,
        Commands::Status(args) => commands::status::execute(args, cli.global).await,
        Commands::Schema(args) => commands::schema::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::List(args) => commands::list::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
    }
}
