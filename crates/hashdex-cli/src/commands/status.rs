//! Status command - compare stored index records with declared schemas

use anyhow::{Context, Result};
use clap::Args;
use hashdex_index::{IndexDefinitionBuilder, IndexRecord, IndexState, SearchStore};
use serde::Serialize;

use super::{connect, load_config, registry, select};
use crate::GlobalOptions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this document type
    #[arg(long = "type", short = 't')]
    type_name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Status of one document type's index
#[derive(Debug, Serialize)]
struct TypeStatus {
    name: String,
    state: IndexState,
    declared_fingerprint: Option<String>,
    #[serde(flatten)]
    record: IndexRecord,
}

/// State a stored record implies for the declared fingerprint.
///
/// A type with no indexed fields is `absent`; a missing or different
/// stored fingerprint is `stale`.
fn state_of(declared: Option<&str>, record: &IndexRecord) -> IndexState {
    match (declared, record.fingerprint.as_ref()) {
        (None, _) => IndexState::Absent,
        (Some(declared), Some(stored)) if stored.as_str() == declared => IndexState::Fresh,
        _ => IndexState::Stale,
    }
}

/// Execute the status command
pub async fn execute(args: StatusArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let declared = registry(&config)?;
    let schemas = select(&declared, args.type_name.as_deref())?;

    let client = connect(&config).await?;
    client.store().ping().await.context("Store did not answer PING")?;

    let mut statuses = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let analysis = client.manager().analyzer().analyze(schema)?;
        let declared_fingerprint =
            IndexDefinitionBuilder::build(&analysis).map(|d| d.fingerprint.to_string());
        let record = client
            .manager()
            .record(schema.name())
            .await
            .with_context(|| format!("Failed to read index record of '{}'", schema.name()))?;

        statuses.push(TypeStatus {
            name: schema.name().to_string(),
            state: state_of(declared_fingerprint.as_deref(), &record),
            declared_fingerprint,
            record,
        });
    }

    if args.json {
        let status = serde_json::json!({
            "store_url": config.store.url,
            "record_prefix": config.index.record_prefix,
            "types": statuses,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Hashdex Status");
    println!("==============\n");
    println!("Store:   {}", config.store.url);
    println!("Records: {}:<index>\n", config.index.record_prefix);

    for status in &statuses {
        println!("{} ({})", status.name, status.state);
        if let Some(ref fingerprint) = status.declared_fingerprint {
            println!("  Declared fingerprint: {}", fingerprint);
        }
        match status.record.fingerprint {
            Some(ref stored) => println!("  Stored fingerprint:   {}", stored),
            None => println!("  Stored fingerprint:   none"),
        }
        if let Some(updated) = status.record.last_updated {
            println!("  Last rebuilt:         {}", updated.to_rfc3339());
        }
        println!("  Queries served:       {}", status.record.total_queries);
    }

    Ok(())
}
