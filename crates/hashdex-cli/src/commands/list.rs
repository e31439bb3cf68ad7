//! List command - stored document ids of one type, by key scan

use anyhow::{Context, Result};
use clap::Args;

use super::search::complete;
use super::{connect, load_config, lookup, print_info, registry, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Document type to list
    #[arg(value_name = "TYPE")]
    type_name: String,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Execute the list command
pub async fn execute(args: ListArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let declared = registry(&config)?;
    let schema = lookup(&declared, &args.type_name)?;

    let client = connect(&config).await?;
    let ids = complete(client.executor().list_ids(schema).await)
        .with_context(|| format!("Failed to list '{}'", schema.name()))?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
        OutputFormat::Text => {
            for id in &ids {
                println!("{}", id);
            }
            print_info(
                &format!("{} documents under '{}'", ids.len(), schema.key_prefix()),
                global.quiet,
            );
        }
    }

    Ok(())
}
