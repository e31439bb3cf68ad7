//! Persisted index records
//!
//! One hash per index name under `<record_prefix>:<index>` holding the
//! fingerprint of the live index, when it was last rebuilt, and how many
//! searches have run against it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::definition::Fingerprint;
use crate::error::Result;
use crate::store::SearchStore;

/// Default namespace of index records.
pub const DEFAULT_RECORD_PREFIX: &str = "index";

/// Record namespace to use for a configured prefix; blank means the default.
pub fn resolve_prefix(prefix: &str) -> String {
    if prefix.trim().is_empty() {
        DEFAULT_RECORD_PREFIX.to_string()
    } else {
        prefix.to_string()
    }
}

pub const FINGERPRINT_FIELD: &str = "fingerprint";
pub const LAST_UPDATED_FIELD: &str = "lastUpdated";
pub const TOTAL_QUERIES_FIELD: &str = "totalQueries";

/// Bookkeeping stored for one index name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    /// Fingerprint of the schema the live index was built from
    pub fingerprint: Option<Fingerprint>,
    /// When the index was last (re)built
    pub last_updated: Option<DateTime<Utc>>,
    /// Searches executed against the index
    pub total_queries: i64,
}

impl IndexRecord {
    /// Store key of the record for `index_name`.
    pub fn key(prefix: &str, index_name: &str) -> String {
        format!("{}:{}", prefix, index_name)
    }

    /// Load the record, treating a missing hash as an empty record.
    pub async fn load(store: &dyn SearchStore, prefix: &str, index_name: &str) -> Result<Self> {
        let hash = store
            .hash_get_all(&Self::key(prefix, index_name))
            .await?;

        let fingerprint = hash
            .get(FINGERPRINT_FIELD)
            .filter(|v| !v.is_empty())
            .map(Fingerprint::from_stored);

        let last_updated = hash.get(LAST_UPDATED_FIELD).and_then(|v| {
            match DateTime::parse_from_rfc3339(v) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    warn!(
                        "Ignoring unparseable {} '{}' for '{}': {}",
                        LAST_UPDATED_FIELD, v, index_name, e
                    );
                    None
                }
            }
        });

        let total_queries = hash
            .get(TOTAL_QUERIES_FIELD)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            fingerprint,
            last_updated,
            total_queries,
        })
    }

    /// Persist a rebuilt index's fingerprint and timestamp.
    ///
    /// The query counter is left untouched.
    pub async fn save_rebuild(
        store: &dyn SearchStore,
        prefix: &str,
        index_name: &str,
        fingerprint: &Fingerprint,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let fields = [
            (FINGERPRINT_FIELD.to_string(), fingerprint.to_string()),
            (
                LAST_UPDATED_FIELD.to_string(),
                at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ];
        store
            .hash_set(&Self::key(prefix, index_name), &fields)
            .await
    }

    /// Bump the query counter, returning the new total.
    pub async fn increment_queries(
        store: &dyn SearchStore,
        prefix: &str,
        index_name: &str,
    ) -> Result<i64> {
        store
            .hash_incr(&Self::key(prefix, index_name), TOTAL_QUERIES_FIELD, 1)
            .await
    }

    /// Whether the record matches `fingerprint`.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprint.as_ref() == Some(fingerprint)
    }
}
