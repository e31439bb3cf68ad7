//! Search command - run a native query against one document type

use anyhow::{Context, Result};
use clap::Args;
use hashdex_index::{NativeQuery, QueryOutcome};

use super::{connect, load_config, lookup, registry, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Document type to search
    #[arg(value_name = "TYPE")]
    type_name: String,

    /// Native query (matches everything when omitted)
    query: Option<String>,

    /// Page to fetch, starting at 1
    #[arg(long, default_value = "1")]
    page: u32,

    /// Results per page (defaults to query.default_page_size)
    #[arg(long)]
    page_size: Option<u32>,

    /// Return these fields of each match instead of ids only
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Unwrap a query outcome, turning a degraded one into an error.
pub fn complete<T>(outcome: QueryOutcome<T>) -> Result<T> {
    match outcome {
        QueryOutcome::Complete(value) => Ok(value),
        QueryOutcome::Degraded { reason } => Err(anyhow::anyhow!(reason)),
    }
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let declared = registry(&config)?;
    let schema = lookup(&declared, &args.type_name)?;

    let client = connect(&config).await?;
    let query = NativeQuery::new(schema.name(), args.query.clone().unwrap_or_default());
    let page_size = args
        .page_size
        .unwrap_or_else(|| client.executor().default_page_size());

    if args.fields.is_empty() {
        let page = complete(client.executor().search(&query, args.page, page_size).await)
            .context("Search failed")?;

        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
            OutputFormat::Text => {
                if !global.quiet {
                    println!(
                        "{} matches in '{}' (page {} of {}):\n",
                        page.total_count, query.index_name, args.page, page.total_pages
                    );
                }
                for id in &page.ids {
                    println!("{}", id);
                }
            }
        }
    } else {
        let page = complete(
            client
                .executor()
                .select(&query, &args.fields, args.page, page_size)
                .await,
        )
        .context("Search failed")?;

        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
            OutputFormat::Text => {
                if !global.quiet {
                    println!(
                        "{} matches in '{}' (page {} of {}):\n",
                        page.total_count, query.index_name, args.page, page.total_pages
                    );
                }
                for row in &page.rows {
                    println!("{}", row.id);
                    for field in &args.fields {
                        let value = row.values.get(field).map(String::as_str).unwrap_or("-");
                        println!("   {}: {}", field, value);
                    }
                }
            }
        }
    }

    Ok(())
}
