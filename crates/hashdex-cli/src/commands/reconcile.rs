//! Reconcile command - bring live indexes in line with declared schemas

use anyhow::Result;
use clap::Args;
use hashdex_index::SchemaRegistry;

use super::{connect, load_config, print_info, registry, select};
use crate::GlobalOptions;

/// Arguments for the reconcile command
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Only reconcile this document type
    #[arg(long = "type", short = 't')]
    type_name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the reconcile command
pub async fn execute(args: ReconcileArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let declared = registry(&config)?;
    let selected: SchemaRegistry = select(&declared, args.type_name.as_deref())?
        .into_iter()
        .cloned()
        .collect();

    let client = connect(&config).await?;
    let report = client.manager().ensure_all(&selected).await;

    if args.json {
        let outcomes: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|(name, outcome)| match outcome {
                Ok(done) => serde_json::json!({ "type": name, "result": done }),
                Err(e) => serde_json::json!({ "type": name, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for (name, outcome) in &report.outcomes {
            match outcome {
                Ok(done) => println!("{}: {}", name, done),
                Err(e) => println!("{}: failed ({})", name, e),
            }
        }
        let skipped = selected.len() - report.outcomes.len();
        if skipped > 0 {
            print_info(
                &format!("{} type(s) declare no indexed fields", skipped),
                global.quiet,
            );
        }
    }

    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!("{} document type(s) failed to reconcile", failed);
    }
    Ok(())
}
