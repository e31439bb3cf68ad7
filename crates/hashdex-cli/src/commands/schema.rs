//! Schema command - resolved field kinds and fingerprints, offline

use anyhow::Result;
use clap::Args;
use hashdex_index::{analyze, IndexDefinitionBuilder};

use super::{load_config, registry, select};
use crate::GlobalOptions;

/// Arguments for the schema command
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Only show this document type
    #[arg(long = "type", short = 't')]
    type_name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the schema command
pub async fn execute(args: SchemaArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let declared = registry(&config)?;

    let mut entries = Vec::new();
    for schema in select(&declared, args.type_name.as_deref())? {
        let analysis = analyze(schema)?;
        let definition = IndexDefinitionBuilder::build(&analysis);
        entries.push((analysis, definition));
    }

    if args.json {
        let json: Vec<serde_json::Value> = entries
            .iter()
            .map(|(analysis, definition)| {
                serde_json::json!({
                    "name": analysis.index_name,
                    "key_prefix": analysis.key_prefix(),
                    "fields": analysis.fields,
                    "fingerprint": definition.as_ref().map(|d| d.fingerprint.to_string()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for (analysis, definition) in &entries {
        println!("{} (keys: {}*)", analysis.index_name, analysis.key_prefix());
        for field in &analysis.fields {
            let unique = if field.unique { "  unique" } else { "" };
            println!("  {:<24} {:<8}{}", field.name, field.kind.as_str(), unique);
        }
        match definition {
            Some(definition) => {
                println!("  Fingerprint: {}", definition.fingerprint);
                if global.verbose {
                    println!("  FT.CREATE {}", definition.schema.create_args().join(" "));
                }
            }
            None => println!("  No indexed fields"),
        }
        println!();
    }

    Ok(())
}
