//! CLI command implementations
//!
//! This module contains all Hashdex CLI command implementations.

pub mod config;
pub mod list;
pub mod reconcile;
pub mod schema;
pub mod search;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use hashdex_config::{ConfigLoader, HashdexConfig};
use hashdex_index::{DocumentSchema, Hashdex, RedisStore, SchemaRegistry};

use crate::GlobalOptions;

/// Output format shared by the query commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions) -> Result<HashdexConfig> {
    let overrides = global.to_config_overrides();
    let loader = ConfigLoader::new();

    // An explicit file replaces global -> local discovery
    if let Some(ref config_path) = global.config {
        let mut config = loader
            .load_file(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?;
        config.apply_overrides(&overrides);
        config.validate()?;
        return Ok(config);
    }

    let root = std::env::current_dir().context("Failed to get current directory")?;
    loader
        .load(&root, Some(&overrides))
        .context("Failed to load configuration")
}

/// Connect to the configured store without reconciling anything.
pub async fn connect(config: &HashdexConfig) -> Result<Hashdex> {
    let store = RedisStore::connect(&config.store)
        .await
        .with_context(|| format!("Failed to connect to {}", config.store.url))?;

    Ok(Hashdex::with_store(Arc::new(store), config)?)
}

/// Build the registry of configured document types.
pub fn registry(config: &HashdexConfig) -> Result<SchemaRegistry> {
    let registry = SchemaRegistry::from_config(config)
        .context("Invalid document type declaration")?;
    if registry.is_empty() {
        anyhow::bail!("No document types declared; add a [[documents]] table to the config");
    }
    Ok(registry)
}

/// Schemas selected by an optional `--type` filter.
pub fn select<'a>(
    registry: &'a SchemaRegistry,
    type_name: Option<&str>,
) -> Result<Vec<&'a DocumentSchema>> {
    match type_name {
        Some(name) => Ok(vec![lookup(registry, name)?]),
        None => Ok(registry.iter().collect()),
    }
}

/// Look up one declared document type.
pub fn lookup<'a>(registry: &'a SchemaRegistry, name: &str) -> Result<&'a DocumentSchema> {
    registry
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Document type '{}' is not declared", name))
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
