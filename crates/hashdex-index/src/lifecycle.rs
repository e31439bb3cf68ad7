//! Index lifecycle management
//!
//! Keeps each document type's search index in step with its declared schema.
//! The stored fingerprint is compared against the current one and the index is
//! dropped and recreated when they differ.
//!
//! Concurrent reconciliations of the same type are not serialized: both may
//! observe a stale record and both rebuild. The store commands are atomic
//! individually, so the outcome converges.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzer::SchemaAnalyzer;
use crate::definition::IndexDefinitionBuilder;
use crate::error::{IndexError, Result};
use crate::record::{self, IndexRecord, DEFAULT_RECORD_PREFIX};
use crate::registry::SchemaRegistry;
use crate::schema::DocumentSchema;
use crate::store::SearchStore;

/// Reconciliation state of one index name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Not reconciled in this process yet
    Unknown,
    /// Type declares no indexed fields
    Absent,
    /// Stored fingerprint differs; rebuild in progress or failed
    Stale,
    /// Live index matches the declared schema
    Fresh,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Unknown => write!(f, "unknown"),
            IndexState::Absent => write!(f, "absent"),
            IndexState::Stale => write!(f, "stale"),
            IndexState::Fresh => write!(f, "fresh"),
        }
    }
}

/// What `ensure_index` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Reconciled {
    /// No indexed fields, nothing to do
    NoIndex,
    /// Fingerprint matched, no store writes
    Unchanged,
    /// Index was (re)created; `dropped` tells whether an old index existed
    Rebuilt { dropped: bool },
}

impl fmt::Display for Reconciled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reconciled::NoIndex => write!(f, "no index"),
            Reconciled::Unchanged => write!(f, "unchanged"),
            Reconciled::Rebuilt { dropped: true } => write!(f, "rebuilt"),
            Reconciled::Rebuilt { dropped: false } => write!(f, "created"),
        }
    }
}

/// Outcome of reconciling every registered type.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Per-type outcome, ordered by type name
    pub outcomes: Vec<(String, Result<Reconciled>)>,
}

impl ReconcileReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, Reconciled)> {
        self.outcomes
            .iter()
            .filter_map(|(name, r)| r.as_ref().ok().map(|r| (name.as_str(), *r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &IndexError)> {
        self.outcomes
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    /// Number of indexes created or rebuilt.
    pub fn rebuilt(&self) -> usize {
        self.succeeded()
            .filter(|(_, r)| matches!(r, Reconciled::Rebuilt { .. }))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Reconciles backend indexes with declared document schemas.
pub struct IndexManager {
    store: Arc<dyn SearchStore>,
    analyzer: SchemaAnalyzer,
    record_prefix: String,
    states: Mutex<HashMap<String, IndexState>>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self::with_record_prefix(store, DEFAULT_RECORD_PREFIX)
    }

    /// Create a manager storing index records under `prefix`.
    ///
    /// A blank prefix falls back to [`DEFAULT_RECORD_PREFIX`], matching the
    /// executor that bumps the query counter.
    pub fn with_record_prefix(store: Arc<dyn SearchStore>, prefix: impl AsRef<str>) -> Self {
        Self {
            store,
            analyzer: SchemaAnalyzer::new(),
            record_prefix: record::resolve_prefix(prefix.as_ref()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_prefix(&self) -> &str {
        &self.record_prefix
    }

    /// Shared schema analyzer.
    pub fn analyzer(&self) -> &SchemaAnalyzer {
        &self.analyzer
    }

    /// Reconciliation state of `index_name` in this process.
    pub fn state(&self, index_name: &str) -> IndexState {
        self.states
            .lock()
            .get(index_name)
            .copied()
            .unwrap_or(IndexState::Unknown)
    }

    fn set_state(&self, index_name: &str, state: IndexState) {
        self.states.lock().insert(index_name.to_string(), state);
    }

    /// Forget every tracked state and cached analysis.
    pub fn reset(&self) {
        self.states.lock().clear();
        self.analyzer.reset();
    }

    /// Load the persisted record for `index_name`.
    pub async fn record(&self, index_name: &str) -> Result<IndexRecord> {
        IndexRecord::load(self.store.as_ref(), &self.record_prefix, index_name).await
    }

    /// Make the backend index of `schema` match its declared fields.
    ///
    /// A matching fingerprint is a no-op. Otherwise the index is dropped
    /// (a missing index is fine), recreated and the new fingerprint stored.
    pub async fn ensure_index(&self, schema: &DocumentSchema) -> Result<Reconciled> {
        let index_name = schema.name();
        let analysis = self.analyzer.analyze(schema)?;

        let Some(definition) = IndexDefinitionBuilder::build(&analysis) else {
            debug!("'{}' has no indexed fields, skipping", index_name);
            self.set_state(index_name, IndexState::Absent);
            return Ok(Reconciled::NoIndex);
        };

        let record = self.record(index_name).await?;
        if record.matches(&definition.fingerprint) {
            debug!("Index '{}' is up to date", index_name);
            self.set_state(index_name, IndexState::Fresh);
            return Ok(Reconciled::Unchanged);
        }

        self.set_state(index_name, IndexState::Stale);
        match record.fingerprint {
            Some(ref old) => info!(
                "Schema of '{}' changed ({} -> {}), rebuilding index",
                index_name, old, definition.fingerprint
            ),
            None => info!("No index record for '{}', building index", index_name),
        }

        let dropped = self.store.drop_index(index_name).await?;
        self.store.create_index(&definition.schema).await?;
        IndexRecord::save_rebuild(
            self.store.as_ref(),
            &self.record_prefix,
            index_name,
            &definition.fingerprint,
            Utc::now(),
        )
        .await?;

        self.set_state(index_name, IndexState::Fresh);
        info!(
            "Index '{}' {} ({} fields)",
            index_name,
            if dropped { "rebuilt" } else { "created" },
            definition.schema.fields.len()
        );

        Ok(Reconciled::Rebuilt { dropped })
    }

    /// Reconcile every registered type with indexed fields.
    ///
    /// Types are reconciled concurrently; a failure is recorded in the report
    /// and does not stop the others.
    pub async fn ensure_all(&self, registry: &SchemaRegistry) -> ReconcileReport {
        let schemas: Vec<&DocumentSchema> = registry.indexed().collect();
        info!("Reconciling {} document types", schemas.len());

        let futures = schemas.into_iter().map(|schema| async move {
            let outcome = self.ensure_index(schema).await;
            if let Err(ref e) = outcome {
                warn!("Failed to reconcile '{}': {}", schema.name(), e);
            }
            (schema.name().to_string(), outcome)
        });

        let report = ReconcileReport {
            outcomes: join_all(futures).await,
        };

        info!(
            "Reconciled {} types ({} rebuilt, {} failed)",
            report.outcomes.len(),
            report.rebuilt(),
            report.failed().count()
        );
        report
    }
}
